//! Storage backends for circuit breaker state
//!
//! This module provides different storage implementations:
//! - `MemoryStorage`: Mutex-guarded state owned by a single process
//! - `RemoteStorage`: State kept in a shared [`KeyValueStore`] so that every
//!   process using the same breaker id sees the same circuit

use crate::errors::StoreError;
use crate::state::{BreakerState, Status};
use crate::store::KeyValueStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Abstract storage backend for one circuit's state
///
/// `record_success` and `record_failure` are the only mutations made by the
/// call path; each is applied as one unit by the backend.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Read the current state
    fn load(&self) -> Result<BreakerState, StoreError>;

    /// Overwrite the status only
    fn set_status(&self, status: Status) -> Result<(), StoreError>;

    /// Reset the failure count and close. Returns the status before closing.
    fn record_success(&self) -> Result<Status, StoreError>;

    /// Count a qualifying failure at `at` and open the circuit when required.
    /// Returns true if this failure tripped the circuit.
    fn record_failure(&self, at: i64, threshold: u64) -> Result<bool, StoreError>;

    /// Administrative override (see [`BreakerState::force`])
    fn force(&self, status: Status) -> Result<(), StoreError>;

    /// Back to the initial state: closed, no failures, never failed
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<BreakerState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<BreakerState, StoreError> {
        Ok(*self.state())
    }

    fn set_status(&self, status: Status) -> Result<(), StoreError> {
        self.state().status = status;
        Ok(())
    }

    fn record_success(&self) -> Result<Status, StoreError> {
        Ok(self.state().record_success())
    }

    fn record_failure(&self, at: i64, threshold: u64) -> Result<bool, StoreError> {
        Ok(self.state().record_failure(at, threshold))
    }

    fn force(&self, status: Status) -> Result<(), StoreError> {
        self.state().force(status);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.state() = BreakerState::default();
        Ok(())
    }
}

/// State shared through a key-value store
///
/// Attributes live under `<id>/attrs/state`, `<id>/attrs/failure_count` and
/// `<id>/attrs/last_failed`. Missing keys read as the initial state, so a
/// circuit materializes lazily on its first write.
///
/// Cross-process updates are only as atomic as the store's primitives: the
/// failure count uses [`KeyValueStore::increment`], while status and
/// timestamp are plain writes and may interleave with other processes.
pub struct RemoteStorage {
    store: Arc<dyn KeyValueStore>,
    state_key: String,
    failure_count_key: String,
    last_failed_key: String,
}

impl RemoteStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, breaker_id: &str) -> Self {
        Self {
            store,
            state_key: format!("{breaker_id}/attrs/state"),
            failure_count_key: format!("{breaker_id}/attrs/failure_count"),
            last_failed_key: format!("{breaker_id}/attrs/last_failed"),
        }
    }

    fn status(&self) -> Result<Status, StoreError> {
        match self.store.get(&self.state_key)? {
            None => Ok(Status::Closed),
            Some(raw) => raw.parse().map_err(|_| StoreError::Corrupt {
                key: self.state_key.clone(),
                value: raw,
            }),
        }
    }

    fn integer<T: std::str::FromStr + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.store.get(key)? {
            None => Ok(T::default()),
            Some(raw) => raw.trim().parse().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: raw,
            }),
        }
    }
}

impl std::fmt::Debug for RemoteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorage")
            .field("store", &"<dyn KeyValueStore>")
            .field("state_key", &self.state_key)
            .finish()
    }
}

impl StorageBackend for RemoteStorage {
    fn load(&self) -> Result<BreakerState, StoreError> {
        Ok(BreakerState {
            status: self.status()?,
            failure_count: self.integer(&self.failure_count_key)?,
            last_failed_at: self.integer(&self.last_failed_key)?,
        })
    }

    fn set_status(&self, status: Status) -> Result<(), StoreError> {
        self.store.set(&self.state_key, status.as_str())
    }

    fn record_success(&self) -> Result<Status, StoreError> {
        let previous = self.status()?;
        self.store.set(&self.failure_count_key, "0")?;
        if previous != Status::Closed {
            self.set_status(Status::Closed)?;
        }
        Ok(previous)
    }

    fn record_failure(&self, at: i64, threshold: u64) -> Result<bool, StoreError> {
        let count = self.store.increment(&self.failure_count_key)?;
        self.store.set(&self.last_failed_key, &at.to_string())?;

        let state = BreakerState {
            status: self.status()?,
            failure_count: count.max(0) as u64,
            last_failed_at: at,
        };
        if !state.should_trip(threshold) {
            return Ok(false);
        }
        if state.status != Status::Open {
            self.set_status(Status::Open)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn force(&self, status: Status) -> Result<(), StoreError> {
        if status == Status::Closed {
            self.store.set(&self.failure_count_key, "0")?;
        }
        self.set_status(status)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(&self.state_key)?;
        self.store.delete(&self.failure_count_key)?;
        self.store.delete(&self.last_failed_key)
    }
}
