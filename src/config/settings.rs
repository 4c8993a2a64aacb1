//! Application settings loaded from config.toml
//!
//! Every field has a default, so a missing default config file is not an error. The
//! `DATABASE_URL` environment variable (usually provided through `.env`) overrides the
//! database location from the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default location of the settings file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Default `SQLite` database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/budget_ledger.sqlite?mode=rwc";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// `SeaORM` connection string for the ledger database
    pub database_url: String,
    /// Background sync settings
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            sync: SyncConfig::default(),
        }
    }
}

/// Settings for the periodic cloud sync
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between two sync cycles
    pub interval_secs: u64,
    /// Maximum number of remote writes in flight during one cycle
    pub max_concurrent: usize,
    /// Delay of the simulated remote endpoint, in milliseconds
    pub remote_latency_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            max_concurrent: 8,
            remote_latency_ms: 500,
        }
    }
}

impl SyncConfig {
    /// Period of the sync timer
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Latency of the simulated remote endpoint
    #[must_use]
    pub const fn remote_latency(&self) -> Duration {
        Duration::from_millis(self.remote_latency_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config {
                message: "sync.interval_secs must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent == 0 {
            return Err(Error::Config {
                message: "sync.max_concurrent must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses settings from TOML text and checks the values.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.sync.validate()?;
    Ok(config)
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A sync setting is zero
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads the settings used by the binary.
///
/// The file named by `BUDGET_CONFIG` must exist; without it `./config.toml` is used when
/// present and built-in defaults otherwise. `DATABASE_URL` wins over the file.
pub fn load_app_configuration() -> Result<AppConfig> {
    let config = match std::env::var("BUDGET_CONFIG") {
        Ok(path) => load_config(path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)?,
        Err(_) => {
            tracing::info!("No {DEFAULT_CONFIG_PATH} found, using default settings");
            AppConfig::default()
        }
    };
    Ok(with_database_override(config, std::env::var("DATABASE_URL").ok()))
}

fn with_database_override(mut config: AppConfig, database_url: Option<String>) -> AppConfig {
    if let Some(url) = database_url.filter(|url| !url.trim().is_empty()) {
        config.database_url = url;
    }
    config
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"

            [sync]
            interval_secs = 60
            max_concurrent = 2
            remote_latency_ms = 10
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.sync.interval(), Duration::from_secs(60));
        assert_eq!(config.sync.max_concurrent, 2);
        assert_eq!(config.sync.remote_latency(), Duration::from_millis(10));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config = parse_config("[sync]\nmax_concurrent = 3\n").unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.sync.interval_secs, 900);
        assert_eq!(config.sync.max_concurrent, 3);

        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = parse_config("[sync]\ninterval_secs = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = parse_config("database_url = ");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_database_override() {
        let config = with_database_override(AppConfig::default(), Some("sqlite::memory:".into()));
        assert_eq!(config.database_url, "sqlite::memory:");

        let config = with_database_override(AppConfig::default(), Some("  ".into()));
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
