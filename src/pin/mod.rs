//! Pinning against the content store
//!
//! `PinService` is the seam to the external store; `PinCoordinator` adds
//! the policy every caller relies on (pin errors propagate, unpin errors are
//! logged and swallowed).

mod coordinator;
mod ipfs;

pub use coordinator::PinCoordinator;
pub use ipfs::IpfsHttpPinService;

use crate::error::PinkeepResult;
use crate::ledger::ResourceKey;
use async_trait::async_trait;

/// External pinning service
///
/// Implementations must treat pinning an already-pinned resource and
/// unpinning a resource that is not pinned as success.
#[async_trait]
pub trait PinService: Send + Sync {
    /// Ask the store to retain `key`
    async fn pin_add(&self, key: &ResourceKey) -> PinkeepResult<()>;

    /// Allow the store to collect `key`
    async fn pin_remove(&self, key: &ResourceKey) -> PinkeepResult<()>;

    /// Human-readable backend name for display
    fn service_name(&self) -> &'static str;
}
