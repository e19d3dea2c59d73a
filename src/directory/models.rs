use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of password-history entries kept per user (oldest evicted)
pub const PASSWORD_HISTORY_LIMIT: usize = 5;

/// A user record as held by the user directory.
///
/// The directory owns the full document; this core only ever touches the
/// `security` sub-record, merging changes into the existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub security: SecurityRecord,
}

/// Security sub-record of a user document, created implicitly on the first
/// password-change or second-factor setup call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRecord {
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default)]
    pub two_factor_setup: Option<TwoFactorSetupRecord>,
    #[serde(default)]
    pub two_factor_activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub two_factor_disabled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub password_history: Vec<PasswordHistoryEntry>,
}

/// Persisted state of a second-factor enrollment. `activated` flips true
/// only once the user has proven possession of the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupRecord {
    pub secret: String,
    pub backup_codes: Vec<BackupCode>,
    pub setup_at: DateTime<Utc>,
    pub activated: bool,
}

/// A single-use fallback credential. Once `used` is set the code must never
/// satisfy verification again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCode {
    pub code: String,
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl BackupCode {
    pub fn new(code: String) -> Self {
        Self {
            code,
            used: false,
            used_at: None,
        }
    }
}

/// Informational audit trail of password changes. Holds no credential
/// material, so it cannot be used to block password reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    #[serde(rename = "type")]
    pub kind: PasswordChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordChangeKind {
    PasswordChange,
    TemporaryPasswordChange,
}

/// Result of starting a second-factor enrollment. This is the only time the
/// secret and backup codes are returned in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetup {
    pub secret: String,
    pub qr_code: String,
    pub backup_codes: Vec<String>,
}
