//! Configuration validation rules.
//!
//! This module provides validation logic for `EngineConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::EngineConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl EngineConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db_path` is empty
    /// - `retention_days` is less than 1
    /// - `sweep_interval_hours` is 0
    /// - `debounce_ms` is negative or exceeds one minute
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "db_path".into(), reason: "must not be empty".into() });
        }

        if self.retention_days < 1 {
            return Err(ConfigError::Invalid {
                field: "retention_days".into(),
                reason: "must be at least 1 day".into(),
            });
        }

        if self.sweep_interval_hours == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_hours".into(),
                reason: "must be at least 1 hour".into(),
            });
        }

        if self.debounce_ms < 0 {
            return Err(ConfigError::Invalid { field: "debounce_ms".into(), reason: "must not be negative".into() });
        }
        if self.debounce_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "debounce_ms".into(),
                reason: "must not exceed one minute (60000ms)".into(),
            });
        }

        Ok(())
    }
}
