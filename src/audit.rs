//! Audit log of pin activity
//!
//! Writes JSON lines to `~/.local/state/pinkeep/audit.log`. This is where
//! failures that are deliberately not propagated end up: released pins that
//! could not be removed, background accesses that failed, sweep summaries.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Audit event names
pub mod events {
    pub const PIN_ADDED: &str = "pin.added";
    pub const PIN_RELEASED: &str = "pin.released";
    pub const PIN_RELEASE_FAILED: &str = "pin.release_failed";
    pub const ACCESS_FAILED: &str = "access.failed";
    pub const NAMESPACE_UPDATED: &str = "namespace.updated";
    pub const SWEEP_COMPLETED: &str = "sweep.completed";
}

/// File-based audit logger that appends JSON lines
#[derive(Debug)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
            write_lock: Mutex::new(()),
        }
    }

    /// Audit logger writing to an explicit file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Audit logger that drops everything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// Silently drops events on IO failure; auditing must never block or
    /// fail a pin workflow.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
