pub mod ip;

pub use ip::{HttpIpResolver, IpResolver};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Fixed vocabulary of security events written by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityEventType {
    #[serde(rename = "password_changed")]
    PasswordChanged,
    #[serde(rename = "temporary_password_changed")]
    TemporaryPasswordChanged,
    #[serde(rename = "2fa_enabled")]
    TwoFactorEnabled,
    #[serde(rename = "2fa_disabled")]
    TwoFactorDisabled,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::PasswordChanged => "password_changed",
            SecurityEventType::TemporaryPasswordChanged => "temporary_password_changed",
            SecurityEventType::TwoFactorEnabled => "2fa_enabled",
            SecurityEventType::TwoFactorDisabled => "2fa_disabled",
        }
    }
}

/// One append-only security event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub event_type: SecurityEventType,
    pub user_id: String,
    /// Best-effort source IP; `"unknown"` when the lookup failed.
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: SecurityEventType,
        user_id: &str,
        ip_address: String,
        user_agent: Option<String>,
        details: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            user_id: user_id.to_string(),
            ip_address,
            user_agent,
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only sink for security events.
///
/// Append failures must never fail or roll back the operation that produced
/// the event; the service logs and continues.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> Result<()>;
}

/// File-backed audit sink writing one JSON line per event into a dated
/// log file.
pub struct FileAuditSink {
    log_path: PathBuf,
}

impl FileAuditSink {
    /// Create a sink rooted at the given directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        if !log_path.exists() {
            fs::create_dir_all(&log_path).context("Failed to create audit log directory")?;
        }
        Ok(Self { log_path })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        let file_path = self
            .log_path
            .join(format!("security_{}.log", Utc::now().format("%Y%m%d")));

        let line = serde_json::to_string(event).context("Failed to serialize audit event")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .with_context(|| format!("Failed to open audit log file: {}", file_path.display()))?;

        writeln!(file, "{}", line).context("Failed to write to audit log file")?;

        debug!("Audit event {} appended to {}", event.id, file_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_event_type_names() {
        assert_eq!(SecurityEventType::PasswordChanged.as_str(), "password_changed");
        assert_eq!(SecurityEventType::TwoFactorEnabled.as_str(), "2fa_enabled");
        assert_eq!(SecurityEventType::TwoFactorDisabled.as_str(), "2fa_disabled");
        assert_eq!(
            SecurityEventType::TemporaryPasswordChanged.as_str(),
            "temporary_password_changed"
        );
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = AuditEvent::new(
            SecurityEventType::PasswordChanged,
            "user-1",
            "203.0.113.9".to_string(),
            Some("test-agent".to_string()),
            None,
        );

        let serialized = serde_json::to_string(&event).unwrap();
        assert!(serialized.contains("\"password_changed\""));

        let deserialized: AuditEvent = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.id, event.id);
        assert_eq!(deserialized.event_type, event.event_type);
    }

    #[test]
    fn test_file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let sink = FileAuditSink::new(dir.path()).unwrap();

        for user in ["user-1", "user-2"] {
            let event = AuditEvent::new(
                SecurityEventType::TwoFactorEnabled,
                user,
                "unknown".to_string(),
                None,
                None,
            );
            sink.append(&event).unwrap();
        }

        let file_path = dir
            .path()
            .join(format!("security_{}.log", Utc::now().format("%Y%m%d")));
        let contents = fs::read_to_string(file_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let event: AuditEvent = serde_json::from_str(line).unwrap();
            assert_eq!(event.event_type, SecurityEventType::TwoFactorEnabled);
        }
    }
}
