//! Engine configuration with layered loading.
//!
//! Configuration is loaded from multiple sources with figment:
//!
//! 1. Environment variables (TABTRAIL_*)
//! 2. TOML config file (if TABTRAIL_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TABTRAIL_*)
/// 2. TOML config file (if TABTRAIL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the SQLite store.
    ///
    /// Set via TABTRAIL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Retention horizon in days; records whose last visit is older are
    /// deleted by the sweeper.
    ///
    /// Set via TABTRAIL_RETENTION_DAYS environment variable.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Hours between scheduled retention sweeps.
    ///
    /// Set via TABTRAIL_SWEEP_INTERVAL_HOURS environment variable.
    #[serde(default = "default_sweep_interval_hours")]
    pub sweep_interval_hours: u64,

    /// Debounce window in milliseconds: repeat visits to the identical
    /// URL inside this window collapse into one accepted visit.
    ///
    /// Set via TABTRAIL_DEBOUNCE_MS environment variable.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: i64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tabtrail.sqlite")
}

fn default_retention_days() -> i64 {
    90
}

fn default_sweep_interval_hours() -> u64 {
    24
}

fn default_debounce_ms() -> i64 {
    3_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: default_retention_days(),
            sweep_interval_hours: default_sweep_interval_hours(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl EngineConfig {
    /// Sweep interval as a Duration for use with tokio timers.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_hours * 3_600)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TABTRAIL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TABTRAIL_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./tabtrail.sqlite"));
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.sweep_interval_hours, 24);
        assert_eq!(config.debounce_ms, 3_000);
    }

    #[test]
    fn test_sweep_interval_duration() {
        let config = EngineConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_secs(86_400));
    }
}
