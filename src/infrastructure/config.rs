//! Configuration management
//!
//! Loads configuration from recycler.toml at startup.
//! Retention caps and logging settings live here instead of hardcoded constants.

use crate::core::DEFAULT_MAX_RETAINED;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "RECYCLER_CONFIG";

/// Recycler configuration
///
/// Loaded from recycler.toml. Every section falls back to defaults when absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Pool settings
    #[serde(default)]
    pub pools: PoolsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings applied to pools the registry creates lazily
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolsConfig {
    /// Retention cap for pools without a per-type override
    #[serde(default = "default_max_retained")]
    pub default_max_retained: usize,

    /// Per-type retention caps, keyed by the full type name
    /// (for example `"my_app::net::Connection"`)
    #[serde(default)]
    pub max_retained: HashMap<String, usize>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "object_recycler=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit console output as JSON
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rolling log files; console only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            default_max_retained: default_max_retained(),
            max_retained: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

fn default_max_retained() -> usize {
    DEFAULT_MAX_RETAINED
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PoolsConfig {
    /// Retention cap for a type, honoring per-type overrides
    pub fn max_retained_for(&self, type_name: &str) -> usize {
        self.max_retained
            .get(type_name)
            .copied()
            .unwrap_or(self.default_max_retained)
    }
}

impl Config {
    /// Load configuration from the file named by `RECYCLER_CONFIG`, or recycler.toml
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "recycler.toml".to_string());
        Self::load_from(config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error (invalid TOML)
    #[error("Failed to parse config: {0}")]
    Parse(String),
}
