//! Error types for circuit breaker operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned from a protected call
///
/// `Open` is reported both when the circuit is cooling down and when another
/// process currently holds the half-open probe lock. Either way the caller
/// should back off instead of retrying immediately.
#[derive(Debug, Error)]
pub enum CircuitError<E = Box<dyn std::error::Error + Send + Sync>> {
    /// Circuit is open, the operation was not invoked
    #[error("Circuit '{circuit}' is open")]
    Open { circuit: String },
    /// The operation did not finish before the call deadline
    #[error("Circuit '{circuit}' call timed out after {timeout:?}")]
    Timeout { circuit: String, timeout: Duration },
    /// The state backend could not be read or written
    #[error("Circuit state storage failed: {0}")]
    Storage(#[from] StoreError),
    /// The wrapped operation failed
    #[error("Circuit execution failed: {0}")]
    Execution(#[source] E),
}

impl<E> CircuitError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitError::Timeout { .. })
    }

    /// Recover the operation's own error, if that is what failed
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures of a key-value store or of decoding what it holds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("corrupt value {value:?} at key '{key}'")]
    Corrupt { key: String, value: String },
}

/// Failures acquiring the distributed probe lock
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Another live owner holds the lock, or won the race to reclaim it
    #[error("lock '{0}' is held by another owner")]
    Contended(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejected breaker configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failure_threshold must be greater than 0")]
    ZeroFailureThreshold,
    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error("jitter_factor must be within 0.0..=1.0, got {0}")]
    InvalidJitter(f64),
    #[error("lock_timeout_secs ({lock_timeout}) must not be shorter than call_timeout_secs ({call_timeout})")]
    LockTimeoutTooShort { lock_timeout: f64, call_timeout: f64 },
}
