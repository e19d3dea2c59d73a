use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audit configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    /// Path to the security event log directory
    pub log_path: String,
}

/// IP-lookup configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IpLookupConfig {
    /// IP-echo service endpoint returning `{"ip": "..."}`
    pub url: String,
    /// Bounded timeout for the best-effort lookup, in seconds
    pub timeout_secs: u64,
}

/// Service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Issuer label used in authenticator provisioning URIs
    pub issuer: String,
    /// Audit configuration
    pub audit: AuditConfig,
    /// IP-lookup configuration
    pub ip_lookup: IpLookupConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            issuer: "Secure Bank".to_string(),
            audit: AuditConfig {
                log_path: "logs".to_string(),
            },
            ip_lookup: IpLookupConfig {
                url: "https://api.ipify.org/?format=json".to_string(),
                timeout_secs: 3,
            },
        }
    }
}

/// Load configuration from a TOML or JSON file, depending on extension.
pub fn load_config(path: &str) -> Result<ServiceConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;

    let config = match path.ends_with(".toml") {
        true => toml::from_str(&contents).context("Failed to parse TOML config")?,
        false => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    Ok(config)
}

/// Save configuration to a TOML or JSON file, depending on extension.
pub fn save_config(path: &str, config: &ServiceConfig) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
    }

    let serialized = match path.ends_with(".toml") {
        true => toml::to_string_pretty(config).context("Failed to serialize config to TOML")?,
        false => {
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?
        }
    };

    std::fs::write(path, serialized).with_context(|| format!("Failed to write config: {}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.issuer, "Secure Bank");
        assert_eq!(config.ip_lookup.timeout_secs, 3);
        assert!(config.ip_lookup.url.contains("format=json"));
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let config_path_str = config_path.to_str().unwrap();

        let mut config = ServiceConfig::default();
        config.issuer = "Test Bank".to_string();
        save_config(config_path_str, &config).unwrap();

        let loaded = load_config(config_path_str).unwrap();
        assert_eq!(loaded.issuer, "Test Bank");
        assert_eq!(loaded.audit.log_path, config.audit.log_path);
    }
}
