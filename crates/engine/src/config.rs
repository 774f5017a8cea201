//! Recovery configuration via `segrecover.toml`
//!
//! Every setting has a default, so the file is optional. Command-line flags
//! override whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use segrecover_core::{Error, Result};

use crate::connection::BOOTSTRAP_DATABASE;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "segrecover.toml";

/// Default number of units of work dispatched concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Default deadline for confirming a failover, in seconds.
pub const DEFAULT_RECONFIGURE_TIMEOUT_SECS: u64 = 600;

/// Recovery configuration loaded from `segrecover.toml`.
///
/// # Example
///
/// ```toml
/// # Concurrency ceiling for per-segment setup work
/// batch_size = 16
///
/// # Seconds to wait for the promoted mirror to serve writes
/// reconfigure_timeout_secs = 600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Concurrency ceiling for a dispatch batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Shared deadline for the probe and confirmation phases.
    #[serde(default = "default_reconfigure_timeout_secs")]
    pub reconfigure_timeout_secs: u64,
    /// Database used for the source-side checkpoint.
    #[serde(default = "default_bootstrap_database")]
    pub bootstrap_database: String,
    /// Path to the `psql` client used by the command-line driver.
    #[serde(default = "default_psql_path")]
    pub psql_path: PathBuf,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_reconfigure_timeout_secs() -> u64 {
    DEFAULT_RECONFIGURE_TIMEOUT_SECS
}

fn default_bootstrap_database() -> String {
    BOOTSTRAP_DATABASE.to_string()
}

fn default_psql_path() -> PathBuf {
    PathBuf::from("psql")
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            reconfigure_timeout_secs: default_reconfigure_timeout_secs(),
            bootstrap_database: default_bootstrap_database(),
            psql_path: default_psql_path(),
        }
    }
}

impl RecoveryConfig {
    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.reconfigure_timeout_secs == 0 {
            return Err(Error::Config(
                "reconfigure_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.bootstrap_database.trim().is_empty() {
            return Err(Error::Config(
                "bootstrap_database must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Reconfigure deadline as a duration.
    pub fn reconfigure_timeout(&self) -> Duration {
        Duration::from_secs(self.reconfigure_timeout_secs)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: RecoveryConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = RecoveryConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.reconfigure_timeout(), Duration::from_secs(600));
        assert_eq!(config.bootstrap_database, "template1");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        assert_eq!(RecoveryConfig::from_file(&path).unwrap(), RecoveryConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "batch_size = 4\nreconfigure_timeout_secs = 30\n").unwrap();

        let config = RecoveryConfig::from_file(&path).unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.reconfigure_timeout_secs, 30);
        assert_eq!(config.psql_path, PathBuf::from("psql"));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "batch_size = 0\n").unwrap();

        let err = RecoveryConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "durability = \"always\"\n").unwrap();

        assert!(RecoveryConfig::from_file(&path).is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = RecoveryConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = RecoveryConfig {
            batch_size: 2,
            reconfigure_timeout_secs: 90,
            bootstrap_database: "postgres".to_string(),
            psql_path: PathBuf::from("/usr/local/bin/psql"),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RecoveryConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
