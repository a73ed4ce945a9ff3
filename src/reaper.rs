//! Expiration sweep
//!
//! A sweep lists the ledger, then re-checks every expired candidate under
//! its key lock right before releasing it. An access that refreshes a
//! resource while the sweep is running is therefore never clobbered by the
//! sweep's earlier snapshot.
//!
//! Whether a namespace still points at a candidate is decided under the same
//! lock, from the ledger as it is at that moment. Namespace updates write
//! their entry while holding the lock of the hash they point at.
//!
//! Failures are isolated per key. An entry whose unpin or delete fails
//! keeps its stale expiration and is picked up again by the next sweep.

use crate::audit::{events, AuditLog};
use crate::clock::Clock;
use crate::error::{PinOp, PinkeepError, PinkeepResult};
use crate::ledger::{KeyLocks, LedgerEntry, LedgerStore, ResourceKey};
use crate::namespace::namespaces_pinning;
use crate::pin::PinCoordinator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A key the sweep could not finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Keys listed from the ledger
    pub examined: usize,
    /// Expired resources unpinned and removed from the ledger
    pub reaped: Vec<ResourceKey>,
    /// Expired entries dropped without unpinning because a namespace still
    /// points at the resource
    pub retained_for_namespace: Vec<ResourceKey>,
    /// Candidates refreshed by an access before they could be reaped
    pub skipped_refreshed: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            examined: 0,
            reaped: Vec::new(),
            retained_for_namespace: Vec::new(),
            skipped_refreshed: 0,
            failures: Vec::new(),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether every key was processed without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, key: &str, error: impl ToString) {
        self.failures.push(SweepFailure {
            key: key.to_string(),
            error: error.to_string(),
        });
    }
}

/// What a single candidate turned into
enum Disposition {
    Reaped,
    RetainedForNamespace,
    Refreshed,
}

/// Releases resources whose retention window has elapsed
#[derive(Clone)]
pub struct Reaper {
    ledger: Arc<dyn LedgerStore>,
    pins: PinCoordinator,
    locks: KeyLocks,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditLog>,
}

impl Reaper {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        pins: PinCoordinator,
        locks: KeyLocks,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            ledger,
            pins,
            locks,
            clock,
            audit,
        }
    }

    /// Expired resources a sweep would release right now, without touching anything
    pub async fn plan(&self) -> PinkeepResult<Vec<ResourceKey>> {
        let now = self.clock.now();
        let mut report = SweepReport::new(now);
        self.scan(now, &mut report).await
    }

    /// Run one sweep over the whole ledger
    ///
    /// Only a failure to list the ledger aborts the sweep; everything else is
    /// recorded in the report.
    pub async fn sweep(&self) -> PinkeepResult<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::new(now);

        let candidates = self.scan(now, &mut report).await?;

        for key in candidates {
            match self.reap_one(&key, now).await {
                Ok(Disposition::Reaped) => report.reaped.push(key),
                Ok(Disposition::RetainedForNamespace) => report.retained_for_namespace.push(key),
                Ok(Disposition::Refreshed) => report.skipped_refreshed += 1,
                Err(e) => {
                    warn!("Failed to reap {}: {}", key, e);
                    report.fail(key.as_str(), e);
                }
            }
        }

        info!(
            "Purged old IPFS resources: {} reaped, {} failed",
            report.reaped.len(),
            report.failure_count()
        );
        self.audit
            .log(
                events::SWEEP_COMPLETED,
                &serde_json::json!({
                    "run_id": report.run_id,
                    "examined": report.examined,
                    "reaped": report.reaped,
                    "failures": report.failures,
                }),
            )
            .await;

        Ok(report)
    }

    /// Read every entry once, returning expired candidates
    async fn scan(
        &self,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> PinkeepResult<Vec<ResourceKey>> {
        let keys = self.ledger.keys().await?;
        report.examined = keys.len();

        let mut candidates = Vec::new();

        for key in keys {
            match self.ledger.get(&key).await {
                Ok(Some(LedgerEntry::ExpiringResource {
                    key: resource,
                    expires_at,
                })) if expires_at < now => {
                    candidates.push(resource);
                }
                // Unexpired, namespace pin, or deleted since listing
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to read ledger entry {}: {}", key, e);
                    report.fail(&key, e);
                }
            }
        }

        debug!(
            "Sweep found {} expired of {} entries",
            candidates.len(),
            report.examined
        );
        Ok(candidates)
    }

    async fn reap_one(&self, key: &ResourceKey, now: DateTime<Utc>) -> PinkeepResult<Disposition> {
        let _guard = self.locks.lock(key.as_str()).await;

        // Re-check: an access may have refreshed the entry since the scan
        let still_expired = self
            .ledger
            .get(key.as_str())
            .await?
            .is_some_and(|entry| entry.is_expired_at(now));
        if !still_expired {
            debug!("{} was refreshed during sweep, keeping it", key);
            return Ok(Disposition::Refreshed);
        }

        let owners = namespaces_pinning(self.ledger.as_ref(), key).await?;
        if !owners.is_empty() {
            self.ledger.delete(key.as_str()).await?;
            debug!("{} expired but is the current resource of {}", key, owners[0]);
            return Ok(Disposition::RetainedForNamespace);
        }

        if !self.pins.unpin(key).await {
            return Err(PinkeepError::pin(
                PinOp::Remove,
                key.as_str(),
                "pin release failed, entry kept for retry",
            ));
        }

        self.ledger.delete(key.as_str()).await?;
        debug!("Reaped {}", key);
        Ok(Disposition::Reaped)
    }

    /// Sweep every `period` until `shutdown` flips to `true` or its sender drops
    ///
    /// With `sweep_immediately` the first sweep runs right away, otherwise
    /// after one full period.
    pub async fn run_periodic(
        &self,
        period: Duration,
        sweep_immediately: bool,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !sweep_immediately {
            ticker.tick().await;
        }

        info!("Reaper running every {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) if !report.is_clean() => {
                            warn!(
                                "Sweep {} left {} key(s) for retry",
                                report.run_id,
                                report.failure_count()
                            );
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Sweep failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reaper stopped");
    }
}
