//! Configuration management for Huddle
//!
//! Configuration comes from a TOML file or from `HUDDLE_<SECTION>_<KEY>`
//! environment variables layered over the defaults. Either way it is
//! validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite storage
    pub store: StoreConfig,

    /// Logging output
    pub logging: LoggingConfig,

    /// Event limits
    pub events: EventsConfig,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long a writer waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Event configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Longest accepted event title, in characters
    pub max_title_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./huddle.db"),
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { max_title_length: 200 }
    }
}

fn env_parse<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue { var, message: e.to_string() }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: HUDDLE_<SECTION>_<KEY>
    /// Example: HUDDLE_STORE_DATABASE_PATH=/var/lib/huddle.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = env::var("HUDDLE_STORE_DATABASE_PATH") {
            config.store.database_path = PathBuf::from(path);
        }
        if let Some(pool_size) = env_parse("HUDDLE_STORE_POOL_SIZE")? {
            config.store.pool_size = pool_size;
        }
        if let Ok(timeout) = env::var("HUDDLE_STORE_BUSY_TIMEOUT") {
            config.store.busy_timeout =
                humantime::parse_duration(&timeout).map_err(|e| ConfigError::InvalidValue {
                    var: "HUDDLE_STORE_BUSY_TIMEOUT",
                    message: e.to_string(),
                })?;
        }

        if let Ok(level) = env::var("HUDDLE_LOGGING_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = env_parse("HUDDLE_LOGGING_JSON_FORMAT")? {
            config.logging.json_format = json;
        }
        if let Some(with_timestamp) = env_parse("HUDDLE_LOGGING_WITH_TIMESTAMP")? {
            config.logging.with_timestamp = with_timestamp;
        }
        if let Some(with_target) = env_parse("HUDDLE_LOGGING_WITH_TARGET")? {
            config.logging.with_target = with_target;
        }

        if let Some(max_title_length) = env_parse("HUDDLE_EVENTS_MAX_TITLE_LENGTH")? {
            config.events.max_title_length = max_title_length;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_path must not be empty".to_string(),
            ));
        }

        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.events.max_title_length == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_title_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.events.max_title_length, 200);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.store.pool_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.store.database_path = PathBuf::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.events.max_title_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huddle.toml");

        let mut config = Config::default();
        config.store.busy_timeout = Duration::from_millis(1500);
        config.events.max_title_length = 80;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huddle.toml");
        std::fs::write(&path, "[events]\nmax_title_length = 64\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.events.max_title_length, 64);
        assert_eq!(loaded.store, StoreConfig::default());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = Config::from_file("/nonexistent/huddle.toml");
        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }
}
