//! Key-value store primitives used by shared breaker state and the probe lock

use crate::errors::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Text key-value store shared by cooperating processes
///
/// `set_if_absent` and `get_and_replace` must be atomic. `increment` and
/// `delete_if_equals` have get-then-write default implementations; stores
/// that offer atomic versions should override them.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Create `key` only if it does not exist. Returns true if it was created.
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Store `value` and return what was there before
    fn get_and_replace(&self, key: &str, value: &str) -> Result<Option<String>, StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Add one to an integer value (absent counts as 0) and return the result
    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let current = match self.get(key)? {
            None => 0,
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: raw,
            })?,
        };
        let next = current + 1;
        self.set(key, &next.to_string())?;
        Ok(next)
    }

    /// Delete `key` only if it currently holds `expected`. Returns true if deleted.
    fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        if self.get(key)?.as_deref() == Some(expected) {
            // Another writer can slip in between the read and the delete.
            self.delete(key)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Mutex-guarded map; every primitive is atomic
///
/// Shared through an `Arc`, it lets several breakers in one process behave
/// like separate processes pointed at the same store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn get_and_replace(&self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().insert(key.to_string(), value.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }

    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries();
        let current = match entries.get(key) {
            None => 0,
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: raw.clone(),
            })?,
        };
        let next = current + 1;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries();
        if entries.get(key).map(String::as_str) == Some(expected) {
            entries.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
