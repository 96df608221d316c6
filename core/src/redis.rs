//! Redis-backed [`KeyValueStore`]
//!
//! Uses `SETNX`, `GETSET`, `INCR` and `DEL`, plus a Lua script so that lock
//! release only deletes a record that still carries the releasing stamp.

use crate::errors::StoreError;
use crate::store::KeyValueStore;
use redis::{Client, Commands, Connection, RedisError, Script};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lua script for safe lock release.
/// Only deletes the key if the stored value matches the expected stamp.
const DELETE_IF_EQUALS_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Synchronous Redis store over a single connection
pub struct RedisStore {
    conn: Mutex<Connection>,
    delete_if_equals: Script,
}

impl RedisStore {
    /// Connect to a Redis URL (e.g., "redis://127.0.0.1:6379")
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let conn = client.get_connection().map_err(map_redis_error)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            delete_if_equals: Script::new(DELETE_IF_EQUALS_SCRIPT),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn().get(key).map_err(map_redis_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()
            .set::<_, _, ()>(key, value)
            .map_err(map_redis_error)
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.conn().set_nx(key, value).map_err(map_redis_error)
    }

    fn get_and_replace(&self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        self.conn().getset(key, value).map_err(map_redis_error)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .del::<_, ()>(key)
            .map_err(map_redis_error)
    }

    fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.conn().incr(key, 1).map_err(map_redis_error)
    }

    fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let deleted: i64 = self
            .delete_if_equals
            .key(key)
            .arg(expected)
            .invoke(&mut *self.conn())
            .map_err(map_redis_error)?;
        Ok(deleted == 1)
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_redis_error() {
        let err = map_redis_error(RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        match err {
            StoreError::Backend(msg) => assert!(msg.contains("connection refused")),
            other => panic!("Expected Backend, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_script_compares_before_deleting() {
        assert!(DELETE_IF_EQUALS_SCRIPT.contains("redis.call(\"get\""));
        assert!(DELETE_IF_EQUALS_SCRIPT.contains("redis.call(\"del\""));
    }

    #[test]
    fn test_open_rejects_malformed_url() {
        assert!(matches!(
            RedisStore::open("not a url"),
            Err(StoreError::Backend(_))
        ));
    }
}
