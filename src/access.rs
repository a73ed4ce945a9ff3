//! Pin-on-first-sight access tracking

use crate::clock::Clock;
use crate::error::{PinkeepError, PinkeepResult};
use crate::ledger::{KeyLocks, LedgerEntry, LedgerStore, ResourceKey};
use crate::pin::PinCoordinator;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Default retention for a resource that stops being accessed
pub const DEFAULT_EXPIRATION_DAYS: u32 = 7;

/// Longest accepted retention, about a century
pub const MAX_EXPIRATION_DAYS: u32 = 36_500;

/// Retention window for `days`, rejecting zero and anything past the cap
pub fn expiration_window(days: u32) -> PinkeepResult<Duration> {
    if days == 0 || days > MAX_EXPIRATION_DAYS {
        return Err(PinkeepError::ExpirationWindow {
            days,
            max: MAX_EXPIRATION_DAYS,
        });
    }
    Ok(Duration::days(i64::from(days)))
}

/// What a recorded access did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessOutcome {
    /// The resource was not tracked before and has just been pinned
    pub first_sight: bool,
    pub expires_at: DateTime<Utc>,
}

/// Pins fetched resources and keeps their expiration window fresh
#[derive(Clone)]
pub struct AccessTracker {
    ledger: Arc<dyn LedgerStore>,
    pins: PinCoordinator,
    locks: KeyLocks,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl AccessTracker {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        pins: PinCoordinator,
        locks: KeyLocks,
        clock: Arc<dyn Clock>,
        expiration_window_days: u32,
    ) -> PinkeepResult<Self> {
        Ok(Self {
            ledger,
            pins,
            locks,
            clock,
            window: expiration_window(expiration_window_days)?,
        })
    }

    /// Record one access to `key`
    ///
    /// The first access pins the resource; every access pushes its
    /// expiration to `now + window`. If the first-sight pin fails nothing
    /// is written, so an untracked resource is never assumed pinned.
    pub async fn record_access(&self, key: &ResourceKey) -> PinkeepResult<AccessOutcome> {
        let _guard = self.locks.lock(key.as_str()).await;

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.window).ok_or_else(|| {
            PinkeepError::Internal(format!(
                "expiration of {} overflows the clock ({} + {} days)",
                key,
                now,
                self.window.num_days()
            ))
        })?;

        let tracked = matches!(
            self.ledger.get(key.as_str()).await?,
            Some(LedgerEntry::ExpiringResource { .. })
        );

        if !tracked {
            self.pins.pin(key).await?;
            info!("Pinned new IPFS resource: {}", key);
        }

        self.ledger
            .set(
                key.as_str(),
                LedgerEntry::ExpiringResource {
                    key: key.clone(),
                    expires_at,
                },
            )
            .await?;

        debug!("{} expires at {}", key, expires_at);

        Ok(AccessOutcome {
            first_sight: !tracked,
            expires_at,
        })
    }
}
