/// Identity-provider failures
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No authenticated session")]
    NoSession,

    #[error("Identity backend error: {0}")]
    Backend(String),
}

/// The signed-in principal as seen by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

/// Narrow interface to the authentication backend.
///
/// Re-authentication proves the current credential immediately before a
/// sensitive change, independent of the existing session's validity.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<AuthenticatedUser>;

    /// Verify the given credential for the given email.
    fn reauthenticate(&self, email: &str, password: &str) -> Result<(), IdentityError>;

    /// Replace the stored credential of the current session's user.
    fn update_credential(&self, new_password: &str) -> Result<(), IdentityError>;

    /// Terminate the current session and purge any cached tokens.
    fn sign_out(&self) -> Result<(), IdentityError>;
}
