//! Test doubles for the pin service and the ledger

use crate::error::{PinOp, PinkeepError, PinkeepResult, StorageOp};
use crate::ledger::{LedgerEntry, LedgerStore, MemoryLedger, ResourceKey};
use crate::pin::PinService;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn key(raw: &str) -> ResourceKey {
    ResourceKey::parse(raw).unwrap()
}

/// One call made against the pin service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinCall {
    Add(ResourceKey),
    Remove(ResourceKey),
}

/// Pin service that records calls and fails on request
#[derive(Debug, Default)]
pub struct RecordingPinService {
    calls: Mutex<Vec<PinCall>>,
    pinned: Mutex<HashSet<ResourceKey>>,
    fail_pin: Mutex<HashSet<ResourceKey>>,
    fail_unpin: Mutex<HashSet<ResourceKey>>,
}

impl RecordingPinService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pin(&self, key: &ResourceKey) {
        self.fail_pin.lock().unwrap().insert(key.clone());
    }

    pub fn fail_unpin(&self, key: &ResourceKey) {
        self.fail_unpin.lock().unwrap().insert(key.clone());
    }

    pub fn calls(&self) -> Vec<PinCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pin_count(&self, key: &ResourceKey) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PinCall::Add(k) if k == key))
            .count()
    }

    pub fn unpin_count(&self, key: &ResourceKey) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PinCall::Remove(k) if k == key))
            .count()
    }

    pub fn is_pinned(&self, key: &ResourceKey) -> bool {
        self.pinned.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl PinService for RecordingPinService {
    async fn pin_add(&self, key: &ResourceKey) -> PinkeepResult<()> {
        self.calls.lock().unwrap().push(PinCall::Add(key.clone()));
        if self.fail_pin.lock().unwrap().contains(key) {
            return Err(PinkeepError::pin(PinOp::Add, key.as_str(), "injected failure"));
        }
        self.pinned.lock().unwrap().insert(key.clone());
        Ok(())
    }

    async fn pin_remove(&self, key: &ResourceKey) -> PinkeepResult<()> {
        self.calls.lock().unwrap().push(PinCall::Remove(key.clone()));
        if self.fail_unpin.lock().unwrap().contains(key) {
            return Err(PinkeepError::pin(PinOp::Remove, key.as_str(), "injected failure"));
        }
        self.pinned.lock().unwrap().remove(key);
        Ok(())
    }

    fn service_name(&self) -> &'static str {
        "recording"
    }
}

/// Memory ledger with per-key failure injection
#[derive(Debug, Default)]
pub struct FlakyLedger {
    inner: MemoryLedger,
    fail_get: Mutex<HashSet<String>>,
    fail_set: Mutex<HashSet<String>>,
    fail_delete: Mutex<HashSet<String>>,
    fail_keys: Mutex<bool>,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_get(&self, key: &str) {
        self.fail_get.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_set(&self, key: &str) {
        self.fail_set.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_delete(&self, key: &str) {
        self.fail_delete.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_keys(&self) {
        *self.fail_keys.lock().unwrap() = true;
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn get(&self, key: &str) -> PinkeepResult<Option<LedgerEntry>> {
        if self.fail_get.lock().unwrap().contains(key) {
            return Err(PinkeepError::storage(StorageOp::Get, key, "injected failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, entry: LedgerEntry) -> PinkeepResult<()> {
        if self.fail_set.lock().unwrap().contains(key) {
            return Err(PinkeepError::storage(StorageOp::Set, key, "injected failure"));
        }
        self.inner.set(key, entry).await
    }

    async fn delete(&self, key: &str) -> PinkeepResult<()> {
        if self.fail_delete.lock().unwrap().contains(key) {
            return Err(PinkeepError::storage(StorageOp::Delete, key, "injected failure"));
        }
        self.inner.delete(key).await
    }

    async fn keys(&self) -> PinkeepResult<Vec<String>> {
        if *self.fail_keys.lock().unwrap() {
            return Err(PinkeepError::storage(StorageOp::Keys, "*", "injected failure"));
        }
        self.inner.keys().await
    }
}
