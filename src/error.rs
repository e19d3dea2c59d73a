use crate::directory::DirectoryError;
use crate::identity::IdentityError;

/// Failure classification for credential and second-factor operations.
///
/// Every public operation surfaces one of these; none is silently discarded
/// except the explicitly best-effort audit and IP-lookup paths, which are
/// swallowed inside the service.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("No authenticated session")]
    NotAuthenticated,

    #[error("Password does not meet security requirements: {0}")]
    WeakPassword(String),

    #[error("New password and confirmation do not match")]
    PasswordMismatch,

    #[error("A two-factor authentication code is required")]
    TwoFactorRequired,

    #[error("Invalid two-factor authentication code")]
    InvalidTwoFactorCode,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("Account is not using a temporary password")]
    NotATemporaryPassword,

    #[error("Two-factor setup has not been started")]
    SetupNotStarted,

    #[error("Password is incorrect")]
    WrongPassword,

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl From<DirectoryError> for SecurityError {
    fn from(err: DirectoryError) -> Self {
        SecurityError::Unknown(err.to_string())
    }
}

impl From<IdentityError> for SecurityError {
    fn from(err: IdentityError) -> Self {
        SecurityError::Unknown(err.to_string())
    }
}
