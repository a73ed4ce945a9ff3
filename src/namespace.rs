//! Current-resource-per-namespace pinning
//!
//! A namespace (e.g. the client release for a network) always points at one
//! pinned resource. Advancing it pins the new resource, records it, and only
//! then releases the old one, so a crash at any step leaves at least one
//! resource pinned for the namespace.

use crate::audit::{events, AuditLog};
use crate::error::{PinkeepError, PinkeepResult, StorageOp};
use crate::ledger::{KeyLocks, LedgerEntry, LedgerStore, NamespaceKey, ResourceKey};
use crate::pin::PinCoordinator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a namespace update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceUpdate {
    /// The namespace already pointed at the requested resource
    Unchanged,
    /// The namespace now points at the requested resource
    Advanced {
        previous: Option<ResourceKey>,
        /// Whether the previous resource's pin was removed
        released: bool,
    },
}

/// Maintains one current pinned resource per namespace
#[derive(Clone)]
pub struct NamespacePinner {
    ledger: Arc<dyn LedgerStore>,
    pins: PinCoordinator,
    locks: KeyLocks,
    audit: Arc<AuditLog>,
}

impl NamespacePinner {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        pins: PinCoordinator,
        locks: KeyLocks,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            ledger,
            pins,
            locks,
            audit,
        }
    }

    /// Resource currently pinned for `namespace`
    pub async fn current(&self, namespace: &NamespaceKey) -> PinkeepResult<Option<ResourceKey>> {
        match self.ledger.get(namespace.as_str()).await? {
            None => Ok(None),
            Some(LedgerEntry::NamespacePin { pinned_hash, .. }) => Ok(Some(pinned_hash)),
            Some(LedgerEntry::ExpiringResource { .. }) => Err(PinkeepError::storage(
                StorageOp::Get,
                namespace.as_str(),
                "entry is not a namespace pin",
            )),
        }
    }

    /// Point `namespace` at `new_key`
    ///
    /// Order is pin, persist, release. A pin failure leaves the ledger and
    /// the old pin untouched. A persist failure leaves the new pin orphaned
    /// and the namespace unchanged.
    pub async fn update_namespace(
        &self,
        namespace: &NamespaceKey,
        new_key: &ResourceKey,
    ) -> PinkeepResult<NamespaceUpdate> {
        let _guard = self.locks.lock(namespace.as_str()).await;

        let previous = self.current(namespace).await?;
        if previous.as_ref() == Some(new_key) {
            debug!("Namespace {} already at {}", namespace, new_key);
            return Ok(NamespaceUpdate::Unchanged);
        }

        // Held until the namespace entry is durable, so a sweep of an expired
        // entry for the same hash cannot unpin it in between
        let new_guard = self.locks.lock(new_key.as_str()).await;
        self.pins.pin(new_key).await?;

        let entry = LedgerEntry::NamespacePin {
            key: namespace.clone(),
            pinned_hash: new_key.clone(),
        };
        if let Err(e) = self.ledger.set(namespace.as_str(), entry).await {
            warn!(
                "Pinned {} but could not record it for {}; pin is orphaned: {}",
                new_key, namespace, e
            );
            return Err(e);
        }
        drop(new_guard);

        info!("Pinned new resource for {}: {}", namespace, new_key);
        self.audit
            .log(
                events::NAMESPACE_UPDATED,
                &serde_json::json!({
                    "namespace": namespace,
                    "key": new_key,
                    "previous": previous,
                }),
            )
            .await;

        let released = match &previous {
            Some(old) => self.release_previous(old).await,
            None => false,
        };

        Ok(NamespaceUpdate::Advanced { previous, released })
    }

    /// Unpin a superseded resource unless access tracking or another
    /// namespace still owns it
    async fn release_previous(&self, old: &ResourceKey) -> bool {
        let _guard = self.locks.lock(old.as_str()).await;

        match self.ledger.get(old.as_str()).await {
            Ok(Some(LedgerEntry::ExpiringResource { .. })) => {
                debug!("{} is access-tracked, leaving release to the reaper", old);
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not check tracking state of {}, keeping pin: {}", old, e);
                return false;
            }
        }

        match namespaces_pinning(self.ledger.as_ref(), old).await {
            Ok(owners) if owners.is_empty() => self.pins.unpin(old).await,
            Ok(owners) => {
                debug!("{} is still current for {}, keeping pin", old, owners[0]);
                false
            }
            Err(e) => {
                warn!("Could not check namespace owners of {}, keeping pin: {}", old, e);
                false
            }
        }
    }
}

/// Namespaces whose current resource is `key`
///
/// Callers hold the lock on `key`: namespace updates write their entry under
/// the lock of the hash they point at, so the answer cannot go stale while
/// the lock is held.
pub(crate) async fn namespaces_pinning(
    ledger: &dyn LedgerStore,
    key: &ResourceKey,
) -> PinkeepResult<Vec<NamespaceKey>> {
    let mut owners = Vec::new();

    for ledger_key in ledger.keys().await? {
        if NamespaceKey::parse(&ledger_key).is_err() {
            continue;
        }
        if let Some(LedgerEntry::NamespacePin {
            key: namespace,
            pinned_hash,
        }) = ledger.get(&ledger_key).await?
        {
            if &pinned_hash == key {
                owners.push(namespace);
            }
        }
    }

    Ok(owners)
}
