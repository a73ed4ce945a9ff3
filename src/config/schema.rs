//! Configuration schema for pinkeep
//!
//! Configuration is stored at `~/.config/pinkeep/config.toml`

use crate::access::{expiration_window, DEFAULT_EXPIRATION_DAYS};
use crate::error::PinkeepResult;
use crate::intercept::DEFAULT_URL_PATTERN;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Expiration and sweep settings
    pub cache: CacheConfig,

    /// Request interception settings
    pub intercept: InterceptConfig,

    /// IPFS daemon connection
    pub ipfs: IpfsConfig,

    /// Ledger storage
    pub ledger: LedgerConfig,

    /// Namespace defaults
    pub namespace: NamespaceConfig,
}

impl Config {
    /// Check the values serde cannot bound on its own
    pub fn validate(&self) -> PinkeepResult<()> {
        expiration_window(self.cache.expiration_window_days)?;
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Expiration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Days an unaccessed resource stays pinned
    pub expiration_window_days: u32,

    /// Seconds between reaper sweeps in `serve` mode
    pub sweep_interval_secs: u64,

    /// Sweep once as soon as `serve` starts
    pub sweep_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_window_days: DEFAULT_EXPIRATION_DAYS,
            sweep_interval_secs: 3600,
            sweep_on_start: true,
        }
    }
}

/// Interception settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Requests matching this pattern are tracked
    pub url_pattern: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            url_pattern: DEFAULT_URL_PATTERN.to_string(),
        }
    }
}

/// IPFS RPC API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// Base URL of the daemon's RPC API
    pub api_url: String,

    /// Per-request HTTP timeout in seconds (0 = none)
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Ledger settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger file (defaults to the state directory)
    pub path: Option<PathBuf>,
}

/// Namespace settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// App id used when a command names only the network
    pub default_app: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            default_app: "aragon.aragonpm.eth".to_string(),
        }
    }
}
