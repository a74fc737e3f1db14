//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/repset/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/repset/` (~/.config/repset/)
//! - State/Logs: `$XDG_STATE_HOME/repset/` (~/.local/state/repset/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Coach API connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Backend availability heuristics
    #[serde(default)]
    pub health: HealthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Coach API connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the coach API (e.g., `https://api.repset.app`)
    pub base_url: Option<String>,

    /// Bearer token for authenticated endpoints
    pub api_token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for idempotent reads (mutations are never retried)
    #[serde(default = "default_api_max_retries")]
    pub max_retries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout_secs: default_api_timeout(),
            max_retries: default_api_max_retries(),
        }
    }
}

impl ApiConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_api_timeout() -> u64 {
    30
}

fn default_api_max_retries() -> usize {
    3
}

/// Backend availability heuristics
///
/// Two independent trigger conditions share one down flag: consecutive
/// liveness-probe failures, and a streak of request failures where each
/// failure lands within `failure_window_secs` of the previous one.
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Seconds between liveness probes
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Consecutive failed probes before the backend is considered down
    #[serde(default = "default_probe_failure_threshold")]
    pub probe_failure_threshold: u32,

    /// Request failures in one streak before the backend is considered down
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds within which a new failure continues the current streak
    #[serde(default = "default_failure_window")]
    pub failure_window_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
            probe_failure_threshold: default_probe_failure_threshold(),
            failure_threshold: default_failure_threshold(),
            failure_window_secs: default_failure_window(),
        }
    }
}

impl HealthConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.probe_interval_secs == 0 {
            return Err(Error::Config(
                "health.probe_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.probe_failure_threshold == 0 {
            return Err(Error::Config(
                "health.probe_failure_threshold must be greater than 0".to_string(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(Error::Config(
                "health.failure_threshold must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Probe cadence as a [`Duration`]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Streak window as a [`Duration`]
    pub fn failure_window(&self) -> Duration {
        Duration::from_secs(self.failure_window_secs)
    }
}

fn default_probe_interval() -> u64 {
    10
}

fn default_probe_failure_threshold() -> u32 {
    2
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_failure_window() -> u64 {
    15
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.health.validate()
    }

    /// Returns the config directory
    pub fn config_dir() -> PathBuf {
        xdg_config_home().join("repset")
    }

    /// Returns the default config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Returns the state directory (logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("repset")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("repset.log")
    }
}
