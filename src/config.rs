//! Configuration file support for day0guard
//!
//! Reads configuration from `~/.config/day0guard/config.json`:
//!
//! ```json
//! {
//!   "window_hours": 48,
//!   "max_violations": 20,
//!   "max_dependencies": 5000,
//!   "registry_url": "https://registry.npmjs.org",
//!   "request_timeout_secs": 10,
//!   "check_name": "Day-0 dependency guard"
//! }
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use crate::collect::Limits;
use crate::deps::DEFAULT_MAX_DEPENDENCIES;
use crate::freshness::{DEFAULT_MAX_VIOLATIONS, DEFAULT_WINDOW_HOURS, FreshnessPolicy};
use crate::node::DEFAULT_REGISTRY_URL;
use crate::run::{DEFAULT_CHECK_NAME, Settings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine config directory. HOME environment variable not set.")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Trailing window in hours (default: 24)
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,

    /// Stop checking after this many violations (default: 50)
    #[serde(default = "default_max_violations")]
    pub max_violations: usize,

    /// Cap on distinct dependencies collected (default: 5000)
    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: usize,

    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Name of the check run shown on the pull request
    #[serde(default = "default_check_name")]
    pub check_name: String,
}

fn default_window_hours() -> u64 {
    DEFAULT_WINDOW_HOURS
}

fn default_max_violations() -> usize {
    DEFAULT_MAX_VIOLATIONS
}

fn default_max_dependencies() -> usize {
    DEFAULT_MAX_DEPENDENCIES
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_check_name() -> String {
    DEFAULT_CHECK_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            max_violations: default_max_violations(),
            max_dependencies: default_max_dependencies(),
            registry_url: default_registry_url(),
            request_timeout_secs: default_request_timeout(),
            check_name: default_check_name(),
        }
    }
}

impl Config {
    /// Load configuration from the default path or return defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path, which must exist
    ///
    /// Values are not validated here; flags may still override them.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_hours == 0 {
            return Err(ConfigError::Invalid {
                field: "window_hours",
                message: "must be at least 1".to_string(),
            });
        }
        // chrono durations are bounded by i64 milliseconds
        if self.window_hours > (i64::MAX / 3_600_000) as u64 {
            return Err(ConfigError::Invalid {
                field: "window_hours",
                message: format!("{} is too large", self.window_hours),
            });
        }
        if self.max_dependencies == 0 {
            return Err(ConfigError::Invalid {
                field: "max_dependencies",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.registry_url.starts_with("http://") && !self.registry_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "registry_url",
                message: format!("'{}' is not an http(s) URL", self.registry_url),
            });
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_dependencies: self.max_dependencies,
        }
    }

    pub fn policy(&self) -> FreshnessPolicy {
        FreshnessPolicy {
            window: chrono::Duration::hours(self.window_hours as i64),
            max_violations: self.max_violations,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            limits: self.limits(),
            policy: self.policy(),
            check_name: self.check_name.clone(),
        }
    }
}

/// Returns the config file path: `~/.config/day0guard/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    // Use XDG_CONFIG_HOME if set, otherwise fall back to ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".config"))
                .unwrap_or_default()
        });

    if config_base.as_os_str().is_empty() {
        return Err(ConfigError::NoConfigDir);
    }

    Ok(config_base.join("day0guard").join("config.json"))
}
