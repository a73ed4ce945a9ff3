//! Ledger storage abstraction
//!
//! Per-key operations are atomic; there is no ordering guarantee across keys.

use crate::error::PinkeepResult;
use crate::ledger::entry::LedgerEntry;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Durable key-value record of pin and expiration state
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the entry stored under `key`
    async fn get(&self, key: &str) -> PinkeepResult<Option<LedgerEntry>>;

    /// Store `entry` under `key`, replacing any previous entry
    async fn set(&self, key: &str, entry: LedgerEntry) -> PinkeepResult<()>;

    /// Remove `key`; removing an absent key succeeds
    async fn delete(&self, key: &str) -> PinkeepResult<()>;

    /// All keys currently stored
    async fn keys(&self) -> PinkeepResult<Vec<String>>;

    /// Whether anything is stored under `key`
    async fn has(&self, key: &str) -> PinkeepResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Non-durable ledger kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<BTreeMap<String, LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry, ordered by key
    pub async fn snapshot(&self) -> BTreeMap<String, LedgerEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get(&self, key: &str) -> PinkeepResult<Option<LedgerEntry>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: LedgerEntry) -> PinkeepResult<()> {
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PinkeepResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> PinkeepResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}
