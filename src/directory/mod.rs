pub mod memory;
pub mod models;

pub use memory::InMemoryDirectory;
pub use models::{
    BackupCode, PasswordChangeKind, PasswordHistoryEntry, SecurityRecord, TwoFactorSetup,
    TwoFactorSetupRecord, UserRecord, PASSWORD_HISTORY_LIMIT,
};

use chrono::{DateTime, Utc};

/// User-directory failures
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Directory backend error: {0}")]
    Backend(String),
}

/// Partial update to a user's security sub-record, applied with merge
/// semantics: only fields that are `Some` are written, everything else is
/// left untouched. The directory's update is last-write-wins per field.
#[derive(Debug, Clone, Default)]
pub struct SecurityPatch {
    pub two_factor_enabled: Option<bool>,
    /// `Some(None)` clears any pending or active setup entirely.
    pub two_factor_setup: Option<Option<TwoFactorSetupRecord>>,
    pub two_factor_activated_at: Option<DateTime<Utc>>,
    pub two_factor_disabled_at: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub must_change_password: Option<bool>,
    /// Appended to the history, evicting the oldest entry past the cap.
    pub push_history: Option<PasswordHistoryEntry>,
}

impl SecurityPatch {
    /// Merge this patch into a security record.
    pub fn apply_to(&self, record: &mut SecurityRecord) {
        if let Some(enabled) = self.two_factor_enabled {
            record.two_factor_enabled = enabled;
        }
        if let Some(setup) = &self.two_factor_setup {
            record.two_factor_setup = setup.clone();
        }
        if let Some(at) = self.two_factor_activated_at {
            record.two_factor_activated_at = Some(at);
        }
        if let Some(at) = self.two_factor_disabled_at {
            record.two_factor_disabled_at = Some(at);
        }
        if let Some(at) = self.password_changed_at {
            record.password_changed_at = Some(at);
        }
        if let Some(must) = self.must_change_password {
            record.must_change_password = must;
        }
        if let Some(entry) = &self.push_history {
            record.password_history.push(entry.clone());
            while record.password_history.len() > PASSWORD_HISTORY_LIMIT {
                record.password_history.remove(0);
            }
        }
    }
}

/// Narrow interface to the user store.
///
/// Backed by a document database in production; an in-memory implementation
/// is provided for tests and local tooling.
pub trait UserDirectory: Send + Sync {
    /// Fetch a user record by id.
    fn get(&self, user_id: &str) -> Result<UserRecord, DirectoryError>;

    /// Merge a security patch into the user's record.
    fn apply(&self, user_id: &str, patch: SecurityPatch) -> Result<(), DirectoryError>;

    /// Atomically mark a backup code as used if it exists and is unused.
    /// Returns true when a code was consumed, false otherwise.
    fn consume_backup_code(&self, user_id: &str, code: &str) -> Result<bool, DirectoryError>;
}
