//! Lease-based lock over a shared key-value store
//!
//! The lock record is a single key holding the epoch second at which it was
//! taken. A record older than the lock timeout is considered abandoned and may
//! be reclaimed, so a crashed holder cannot wedge the lock forever. The price
//! is that two owners can overlap if a holder overruns its own timeout.

use crate::clock::{Clock, SystemClock};
use crate::errors::{LockError, StoreError};
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Advisory, self-expiring lock on one store key
pub struct DistributedLock {
    store: Arc<dyn KeyValueStore>,
    key: String,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl DistributedLock {
    /// Create a lock on `key` whose records go stale after `timeout`
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            timeout,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Try to take the lock without waiting
    ///
    /// Fails with [`LockError::Contended`] if a live owner holds it, or if
    /// another contender reclaimed a stale record first.
    pub fn try_acquire(&self) -> Result<LockGuard<'_>, LockError> {
        let now = self.clock.now();
        let stamp = now.to_string();

        if self.store.set_if_absent(&self.key, &stamp)? {
            debug!(key = %self.key, "lock acquired");
            return Ok(self.guard(now));
        }

        let observed = self.store.get(&self.key)?;
        let locked_at = self.parse_stamp(observed.as_deref());
        if !self.is_stale(locked_at, now) {
            return Err(LockError::Contended(self.key.clone()));
        }

        // The loser of a concurrent reclaim still overwrote the record; the
        // winner's stamp is at most a few seconds older, so the lease holds.
        let previous = self.store.get_and_replace(&self.key, &stamp)?;
        if previous != observed {
            debug!(key = %self.key, "lost race to reclaim stale lock");
            return Err(LockError::Contended(self.key.clone()));
        }

        warn!(key = %self.key, locked_at, "reclaimed stale lock");
        Ok(self.guard(now))
    }

    /// Run `body` while holding the lock
    ///
    /// The lock is released however `body` exits, including by panic.
    pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> Result<R, LockError> {
        let _guard = self.try_acquire()?;
        Ok(body())
    }

    /// Whether a live (non-stale) record currently exists
    pub fn is_locked(&self) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(match self.store.get(&self.key)? {
            None => false,
            Some(raw) => !self.is_stale(self.parse_stamp(Some(&raw)), now),
        })
    }

    fn guard(&self, acquired_at: i64) -> LockGuard<'_> {
        LockGuard {
            lock: self,
            acquired_at,
            released: false,
        }
    }

    fn is_stale(&self, stamp: i64, now: i64) -> bool {
        now.saturating_sub(stamp) as f64 > self.timeout.as_secs_f64()
    }

    fn parse_stamp(&self, raw: Option<&str>) -> i64 {
        match raw {
            None => 0,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(key = %self.key, value = raw, "unreadable lock timestamp, treating as stale");
                0
            }),
        }
    }

    /// Delete the record taken at `acquired_at`, unless that lease already
    /// expired and the record may belong to someone else now.
    fn release(&self, acquired_at: i64) -> Result<bool, StoreError> {
        if self.is_stale(acquired_at, self.clock.now()) {
            debug!(key = %self.key, acquired_at, "lease expired before release, leaving record");
            return Ok(false);
        }
        self.store
            .delete_if_equals(&self.key, &acquired_at.to_string())
    }
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Guard that releases the lock when dropped
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a DistributedLock,
    acquired_at: i64,
    released: bool,
}

impl LockGuard<'_> {
    /// Epoch second written into the lock record
    pub fn acquired_at(&self) -> i64 {
        self.acquired_at
    }

    /// Release now and report the outcome instead of logging it on drop.
    ///
    /// Returns false if the record was left in place because the lease had
    /// expired or the record no longer carried this guard's stamp.
    pub fn release(mut self) -> Result<bool, StoreError> {
        self.released = true;
        self.lock.release(self.acquired_at)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.lock.release(self.acquired_at) {
            warn!(key = %self.lock.key, error = %e, "failed to release lock");
        }
    }
}
