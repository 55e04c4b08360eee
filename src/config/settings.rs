//! Configuration settings for the roster engine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub assignment: AssignmentConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("roster.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("roster/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".roster/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn validate(&self) -> Result<()> {
        if self.sync.weeks_ahead == 0 {
            return Err(ConfigError::Invalid("sync.weeks_ahead must be > 0".to_string()).into());
        }
        if self.sync.interval_hours == 0 {
            return Err(
                ConfigError::Invalid("sync.interval_hours must be > 0".to_string()).into(),
            );
        }
        if self.storage.persist && self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_dir is required when storage.persist is enabled".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Expand the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.storage.data_dir);
        PathBuf::from(expanded.as_ref())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for the persisted graph
    pub data_dir: String,
    /// Persist the graph to `data_dir` after every write
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.local/share/roster".to_string(),
            persist: false,
        }
    }
}

/// Background synchronization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Horizon in weeks for the run performed at startup
    pub initial_weeks_ahead: u32,
    /// Horizon in weeks for the periodic runs
    pub weeks_ahead: u32,
    /// Hours between periodic runs
    pub interval_hours: u64,
    /// Run the initial synchronization before the first tick
    pub run_on_startup: bool,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 60 * 60)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            initial_weeks_ahead: 5,
            weeks_ahead: 60,
            interval_hours: 24,
            run_on_startup: true,
        }
    }
}

/// Assignment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub policy: AssignmentPolicy,
}

/// Whether assignment checks the eligibility graph before linking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Link without consulting eligibility.
    #[default]
    Unchecked,
    /// Reject assignments the eligibility graph does not allow.
    EnforceEligibility,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
