use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

use super::models::UserRecord;
use super::{DirectoryError, SecurityPatch, UserDirectory};

/// In-memory user directory, standing in for the document store in tests
/// and local tooling. Updates are last-write-wins per field, matching the
/// merge semantics of the production backend.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn insert(&self, record: UserRecord) {
        self.users
            .write()
            .expect("directory lock poisoned")
            .insert(record.id.clone(), record);
    }
}

impl UserDirectory for InMemoryDirectory {
    fn get(&self, user_id: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .read()
            .expect("directory lock poisoned")
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))
    }

    fn apply(&self, user_id: &str, patch: SecurityPatch) -> Result<(), DirectoryError> {
        let mut users = self.users.write().expect("directory lock poisoned");
        let record = users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))?;
        patch.apply_to(&mut record.security);
        debug!("Applied security patch for user {}", user_id);
        Ok(())
    }

    fn consume_backup_code(&self, user_id: &str, code: &str) -> Result<bool, DirectoryError> {
        let mut users = self.users.write().expect("directory lock poisoned");
        let record = users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))?;

        let setup = match record.security.two_factor_setup.as_mut() {
            Some(setup) => setup,
            None => return Ok(false),
        };

        match setup
            .backup_codes
            .iter_mut()
            .find(|backup| !backup.used && backup.code == code)
        {
            Some(backup) => {
                backup.used = true;
                backup.used_at = Some(Utc::now());
                debug!("Backup code consumed for user {}", user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::models::{BackupCode, TwoFactorSetupRecord};

    fn test_user(id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            security: Default::default(),
        }
    }

    #[test]
    fn test_get_unknown_user() {
        let directory = InMemoryDirectory::new();
        let result = directory.get("nobody");
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn test_backup_code_single_use() {
        let directory = InMemoryDirectory::new();
        let mut user = test_user("alice");
        user.security.two_factor_setup = Some(TwoFactorSetupRecord {
            secret: "SECRET".to_string(),
            backup_codes: vec![BackupCode::new("AAAA1111".to_string())],
            setup_at: Utc::now(),
            activated: true,
        });
        directory.insert(user);

        assert!(directory.consume_backup_code("alice", "AAAA1111").unwrap());
        // Second use of the same code must fail
        assert!(!directory.consume_backup_code("alice", "AAAA1111").unwrap());

        let record = directory.get("alice").unwrap();
        let backup = &record.security.two_factor_setup.unwrap().backup_codes[0];
        assert!(backup.used);
        assert!(backup.used_at.is_some());
    }

    #[test]
    fn test_consume_without_setup() {
        let directory = InMemoryDirectory::new();
        directory.insert(test_user("bob"));
        assert!(!directory.consume_backup_code("bob", "AAAA1111").unwrap());
    }
}
