pub mod password;
pub mod totp;

pub use password::{evaluate, PasswordRequirements, PasswordStrengthResult, MIN_PASSWORD_LENGTH};
