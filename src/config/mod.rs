//! Configuration management for pinkeep

pub mod schema;

pub use schema::Config;

use crate::error::{PinkeepError, PinkeepResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pinkeep")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pinkeep")
    }

    /// Get the audit log path
    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Ledger file for `config`, falling back to the state directory
    pub fn ledger_path(config: &Config) -> PathBuf {
        config
            .ledger
            .path
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("ledger.json"))
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PinkeepResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PinkeepResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PinkeepError::io(format!("reading config from {}", path.display()), e))?;

        let invalid = |reason: String| PinkeepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let config: Config = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PinkeepResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PinkeepError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    async fn ensure_config_dir(&self) -> PinkeepResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PinkeepError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the directories holding the ledger and audit log exist
    pub async fn ensure_state_dirs(config: &Config) -> PinkeepResult<()> {
        let mut dirs = vec![Self::state_dir()];
        if let Some(parent) = Self::ledger_path(config).parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent.to_path_buf());
            }
        }

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                PinkeepError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
