//! Error types for pinkeep
//!
//! All modules use `PinkeepResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pinkeep operations
pub type PinkeepResult<T> = Result<T, PinkeepError>;

/// Ledger operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Get,
    Set,
    Delete,
    Keys,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Keys => "keys",
        };
        write!(f, "{}", name)
    }
}

/// Pin service operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOp {
    Add,
    Remove,
}

impl fmt::Display for PinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "pin add"),
            Self::Remove => write!(f, "pin rm"),
        }
    }
}

/// All errors that can occur in pinkeep
#[derive(Error, Debug)]
pub enum PinkeepError {
    // Ledger errors
    #[error("Ledger {op} failed for '{key}': {reason}")]
    Storage {
        op: StorageOp,
        key: String,
        reason: String,
    },

    #[error("Ledger file {path} is corrupt: {reason}")]
    LedgerCorrupt { path: PathBuf, reason: String },

    // Pin service errors
    #[error("IPFS {op} failed for {key}: {reason}")]
    Pin {
        op: PinOp,
        key: String,
        reason: String,
    },

    // Input errors
    #[error("Invalid resource key: '{0}'")]
    InvalidResourceKey(String),

    #[error("Invalid namespace key: '{0}'")]
    InvalidNamespaceKey(String),

    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidUrlPattern { pattern: String, reason: String },

    #[error("Expiration window of {days} days is out of range (1 to {max})")]
    ExpirationWindow { days: u32, max: u32 },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Runtime errors
    #[error("No tokio runtime available to dispatch background work")]
    NoRuntime,

    #[error("Sweep finished with {failed} failed key(s)")]
    SweepIncomplete { failed: usize },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PinkeepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a ledger storage failure
    pub fn storage(op: StorageOp, key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Storage {
            op,
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a pin service failure
    pub fn pin(op: PinOp, key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Pin {
            op,
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is a ledger read/write/delete/list failure
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::LedgerCorrupt { .. })
    }

    /// Whether this is a failed call to the pin service
    pub fn is_pin_failure(&self) -> bool {
        matches!(self, Self::Pin { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Pin { .. } => Some("Check that the IPFS daemon is running: ipfs daemon"),
            Self::LedgerCorrupt { .. } => {
                Some("Move the ledger file aside; pins will be re-tracked on next access")
            }
            Self::SweepIncomplete { .. } => Some("Failed keys are retried on the next sweep"),
            Self::ConfigInvalid { .. } => Some("Run: pinkeep config init --force"),
            _ => None,
        }
    }
}
