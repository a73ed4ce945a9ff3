//! Wiring of the caching components behind one handle
//!
//! `PinKeeper` owns a single ledger, pin coordinator, lock table and clock
//! and hands clones of them to the namespace pinner, the access tracker and
//! the reaper, so all three serialize on the same keys.

use crate::access::{AccessOutcome, AccessTracker};
use crate::audit::AuditLog;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigManager};
use crate::error::PinkeepResult;
use crate::intercept::{InterceptionAdapter, InterceptionHost, UrlPattern};
use crate::ledger::{FileLedger, KeyLocks, LedgerStore, NamespaceKey, ResourceKey};
use crate::namespace::{NamespacePinner, NamespaceUpdate};
use crate::pin::{IpfsHttpPinService, PinCoordinator, PinService};
use crate::reaper::{Reaper, SweepReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Entry point for pinning, access tracking and expiration
#[derive(Clone)]
pub struct PinKeeper {
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<AuditLog>,
    pattern: UrlPattern,
    default_app: String,
    namespaces: NamespacePinner,
    tracker: AccessTracker,
    reaper: Reaper,
}

impl PinKeeper {
    /// Assemble a keeper from explicit components
    ///
    /// Fails if the configured URL pattern or expiration window is invalid.
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        service: Arc<dyn PinService>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLog>,
        config: &Config,
    ) -> PinkeepResult<Self> {
        let pattern = UrlPattern::parse(&config.intercept.url_pattern)?;
        let locks = KeyLocks::new();
        let pins = PinCoordinator::new(service, Arc::clone(&audit));

        let namespaces = NamespacePinner::new(
            Arc::clone(&ledger),
            pins.clone(),
            locks.clone(),
            Arc::clone(&audit),
        );
        let tracker = AccessTracker::new(
            Arc::clone(&ledger),
            pins.clone(),
            locks.clone(),
            Arc::clone(&clock),
            config.cache.expiration_window_days,
        )?;
        let reaper = Reaper::new(Arc::clone(&ledger), pins, locks, clock, Arc::clone(&audit));

        Ok(Self {
            ledger,
            audit,
            pattern,
            default_app: config.namespace.default_app.clone(),
            namespaces,
            tracker,
            reaper,
        })
    }

    /// Open the configured file ledger and talk to the configured IPFS daemon
    pub async fn from_config(config: &Config) -> PinkeepResult<Self> {
        ConfigManager::ensure_state_dirs(config).await?;

        let ledger_path = ConfigManager::ledger_path(config);
        let ledger = FileLedger::open(&ledger_path).await?;
        debug!("Ledger opened at {}", ledger_path.display());

        let service = IpfsHttpPinService::from_config(&config.ipfs);
        info!("Using {} at {}", service.service_name(), config.ipfs.api_url);

        Self::new(
            Arc::new(ledger),
            Arc::new(service),
            Arc::new(SystemClock),
            Arc::new(AuditLog::new(config)),
            config,
        )
    }

    /// Point `namespace` at `new_key`, releasing its previous resource
    pub async fn pin_namespace_resource(
        &self,
        namespace: &NamespaceKey,
        new_key: &ResourceKey,
    ) -> PinkeepResult<NamespaceUpdate> {
        self.namespaces.update_namespace(namespace, new_key).await
    }

    /// Resource `namespace` currently points at
    pub async fn current_namespace_resource(
        &self,
        namespace: &NamespaceKey,
    ) -> PinkeepResult<Option<ResourceKey>> {
        self.namespaces.current(namespace).await
    }

    /// Namespace key for `network` and `app_id`, or the configured default app
    pub fn namespace_key(
        &self,
        network: &str,
        app_id: Option<&str>,
    ) -> PinkeepResult<NamespaceKey> {
        NamespaceKey::for_app(network, app_id.unwrap_or(&self.default_app))
    }

    /// Start observing requests on `host`
    ///
    /// Matching requests are recorded in the background; the host's requests
    /// are never delayed or altered. Must be called inside a tokio runtime.
    pub fn install_interception_hook(&self, host: &dyn InterceptionHost) -> PinkeepResult<()> {
        let adapter = InterceptionAdapter::new(
            self.pattern.clone(),
            self.tracker.clone(),
            Arc::clone(&self.audit),
        )?;
        Arc::new(adapter).install(host);
        info!("Interception hook installed for {}", self.pattern);
        Ok(())
    }

    /// Record one access and wait for it to finish
    pub async fn record_access(&self, key: &ResourceKey) -> PinkeepResult<AccessOutcome> {
        self.tracker.record_access(key).await
    }

    /// Release every expired resource
    pub async fn sweep_expired_resources(&self) -> PinkeepResult<SweepReport> {
        self.reaper.sweep().await
    }

    /// Resources the next sweep would release
    pub async fn plan_sweep(&self) -> PinkeepResult<Vec<ResourceKey>> {
        self.reaper.plan().await
    }

    /// Sweep every `period` until `shutdown` is signalled
    pub async fn run_reaper(
        &self,
        period: Duration,
        sweep_immediately: bool,
        shutdown: watch::Receiver<bool>,
    ) {
        self.reaper
            .run_periodic(period, sweep_immediately, shutdown)
            .await;
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub fn url_pattern(&self) -> &UrlPattern {
        &self.pattern
    }
}
