//! Per-key async serialization for ledger read-modify-write sequences

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held while a key is being worked on
pub type KeyGuard = OwnedMutexGuard<()>;

/// Advisory locks keyed by ledger key
///
/// Different keys never contend. Idle slots are pruned when new keys are
/// locked, so the map stays proportional to the keys in flight.
#[derive(Debug, Default, Clone)]
pub struct KeyLocks {
    slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and hold it until the guard drops
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            if !slots.contains_key(key) {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(
                slots
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        slot.lock_owned().await
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
