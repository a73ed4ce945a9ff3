//! Pin/unpin policy on top of a `PinService`

use crate::audit::{events, AuditLog};
use crate::error::PinkeepResult;
use crate::ledger::ResourceKey;
use crate::pin::PinService;
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps the pin service with the error policy shared by every component
#[derive(Clone)]
pub struct PinCoordinator {
    service: Arc<dyn PinService>,
    audit: Arc<AuditLog>,
}

impl PinCoordinator {
    pub fn new(service: Arc<dyn PinService>, audit: Arc<AuditLog>) -> Self {
        Self { service, audit }
    }

    /// Pin `key`; failures are returned to the caller
    pub async fn pin(&self, key: &ResourceKey) -> PinkeepResult<()> {
        self.service.pin_add(key).await?;
        debug!("Pinned {} via {}", key, self.service.service_name());
        self.audit
            .log(events::PIN_ADDED, &serde_json::json!({ "key": key }))
            .await;
        Ok(())
    }

    /// Unpin `key`, returning whether the pin was released
    ///
    /// A failed release only wastes space in the store, so it is logged and
    /// audited but never returned as an error.
    pub async fn unpin(&self, key: &ResourceKey) -> bool {
        match self.service.pin_remove(key).await {
            Ok(()) => {
                debug!("Released pin {}", key);
                self.audit
                    .log(events::PIN_RELEASED, &serde_json::json!({ "key": key }))
                    .await;
                true
            }
            Err(e) => {
                warn!("Failed to release pin {}: {}", key, e);
                self.audit
                    .log(
                        events::PIN_RELEASE_FAILED,
                        &serde_json::json!({ "key": key, "error": e.to_string() }),
                    )
                    .await;
                false
            }
        }
    }
}
