//! Shared time-to-live bookkeeping for cached rates.
//!
//! One [`TtlClock`] is shared (via `Arc`) by every provider that should
//! expire on the same schedule. Each expiry bumps an epoch counter; a
//! provider that sees the epoch move flushes its own store, so all of them
//! agree on one expiry cycle no matter which one noticed it first.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use spotrate_common::{expires_after, Clock, SystemClock, Timestamp};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{FxError, FxResult};

#[derive(Debug, Default)]
struct TtlState {
    ttl_seconds: Option<u64>,
    expires_at: Option<Timestamp>,
    epoch: u64,
}

impl TtlState {
    fn is_expired(&self, now: Timestamp) -> bool {
        match (self.ttl_seconds, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at <= now,
            _ => false,
        }
    }

    /// Move the expiration to `now + ttl`. `None` when no TTL is set.
    fn reschedule(&mut self, now: Timestamp) -> Option<Timestamp> {
        let expires_at = expires_after(now, self.ttl_seconds?);
        self.expires_at = Some(expires_at);
        Some(expires_at)
    }
}

/// TTL configuration and the next expiration instant.
#[derive(Debug)]
pub struct TtlClock {
    clock: Arc<dyn Clock>,
    state: RwLock<TtlState>,
}

/// Shared TTL clock.
pub type SharedTtlClock = Arc<TtlClock>;

impl TtlClock {
    /// Create a TTL clock reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, ttl_seconds: Option<u64>) -> Self {
        let ttl = Self {
            clock,
            state: RwLock::new(TtlState::default()),
        };
        ttl.set_ttl(ttl_seconds);
        ttl
    }

    /// Create a TTL clock on the system clock.
    pub fn system(ttl_seconds: Option<u64>) -> Self {
        Self::new(Arc::new(SystemClock), ttl_seconds)
    }

    /// Create a shared TTL clock on the system clock.
    pub fn shared(ttl_seconds: Option<u64>) -> SharedTtlClock {
        Arc::new(Self::system(ttl_seconds))
    }

    /// Current time according to the underlying clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Set the TTL. A `Some` value immediately schedules the next expiration.
    pub fn set_ttl(&self, ttl_seconds: Option<u64>) {
        let mut state = self.state.write();
        state.ttl_seconds = ttl_seconds;

        if let Some(expires_at) = state.reschedule(self.clock.now()) {
            debug!(ttl_seconds = ?ttl_seconds, expires_at = %expires_at, "Rate TTL configured");
        }
    }

    /// Configured TTL in seconds.
    pub fn ttl_seconds(&self) -> Option<u64> {
        self.state.read().ttl_seconds
    }

    /// When cached rates next expire.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.state.read().expires_at
    }

    /// Number of expirations so far.
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Schedule the next expiration `ttl` seconds from now.
    pub fn refresh_expiration(&self) -> FxResult<Timestamp> {
        self.state
            .write()
            .reschedule(self.clock.now())
            .ok_or(FxError::TtlNotConfigured)
    }

    /// Whether rates have expired as of `now`. Never true without a TTL.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.state.read().is_expired(now)
    }

    /// Roll over to a new epoch if the expiration has passed.
    ///
    /// Returns the current epoch. The check and the refresh happen under
    /// one lock, so concurrent callers roll the epoch at most once.
    pub fn poll_epoch(&self) -> u64 {
        let state = self.state.upgradable_read();
        let now = self.clock.now();

        if !state.is_expired(now) {
            return state.epoch;
        }

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        if let Some(expires_at) = state.reschedule(now) {
            state.epoch += 1;
            info!(epoch = state.epoch, expires_at = %expires_at, "Cached rates expired");
        }
        state.epoch
    }
}

impl Default for TtlClock {
    fn default() -> Self {
        Self::system(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use spotrate_common::ManualClock;

    fn manual() -> (Arc<ManualClock>, TtlClock) {
        let clock = Arc::new(ManualClock::frozen());
        let ttl = TtlClock::new(clock.clone(), None);
        (clock, ttl)
    }

    #[test]
    fn test_set_ttl_schedules_expiration() {
        let (clock, ttl) = manual();
        assert_eq!(ttl.expires_at(), None);

        ttl.set_ttl(Some(86400));

        assert_eq!(ttl.ttl_seconds(), Some(86400));
        assert_eq!(ttl.expires_at(), Some(clock.now() + Duration::seconds(86400)));
    }

    #[test]
    fn test_refresh_expiration() {
        let (clock, ttl) = manual();
        ttl.set_ttl(Some(86400));

        clock.advance(Duration::seconds(30));
        let expires_at = ttl.refresh_expiration().unwrap();

        assert_eq!(expires_at, clock.now() + Duration::seconds(86400));
        assert_eq!(ttl.expires_at(), Some(expires_at));
    }

    #[test]
    fn test_refresh_without_ttl_fails() {
        let (_, ttl) = manual();
        assert!(matches!(ttl.refresh_expiration(), Err(FxError::TtlNotConfigured)));
    }

    #[test]
    fn test_never_expires_without_ttl() {
        let (clock, ttl) = manual();
        clock.advance(Duration::days(365));

        assert!(!ttl.is_expired(clock.now()));
        assert_eq!(ttl.poll_epoch(), 0);
    }

    #[test]
    fn test_expiry_boundary() {
        let (clock, ttl) = manual();
        ttl.set_ttl(Some(1000));

        assert!(!ttl.is_expired(clock.now() + Duration::seconds(999)));
        assert!(ttl.is_expired(clock.now() + Duration::seconds(1000)));
    }

    #[test]
    fn test_poll_epoch_rolls_once_per_cycle() {
        let (clock, ttl) = manual();
        ttl.set_ttl(Some(1000));
        assert_eq!(ttl.poll_epoch(), 0);

        clock.advance(Duration::seconds(1001));
        assert_eq!(ttl.poll_epoch(), 1);
        assert_eq!(ttl.poll_epoch(), 1);
        assert_eq!(ttl.expires_at(), Some(clock.now() + Duration::seconds(1000)));

        clock.advance(Duration::seconds(1000));
        assert_eq!(ttl.poll_epoch(), 2);
    }

    #[test]
    fn test_refresh_after_expiry_keeps_epoch() {
        let (clock, ttl) = manual();
        ttl.set_ttl(Some(100));

        clock.advance(Duration::seconds(150));
        let expires_at = ttl.refresh_expiration().unwrap();

        assert_eq!(expires_at, clock.now() + Duration::seconds(100));
        assert!(!ttl.is_expired(clock.now()));
        assert_eq!(ttl.poll_epoch(), 0);
    }

    #[test]
    fn test_clearing_ttl_disables_expiry() {
        let (clock, ttl) = manual();
        ttl.set_ttl(Some(10));
        ttl.set_ttl(None);

        clock.advance(Duration::seconds(60));
        assert!(!ttl.is_expired(clock.now()));
    }
}
