//! Circuit breaker shared across processes through a key-value store
//!
//! Every process that builds a breaker with the same id over the same store
//! sees one circuit. Probe calls (open and cooled down, or half-open) are
//! serialized through a [`DistributedLock`] on `<id>/locks/half_open_retry`,
//! so at most one process probes the dependency at a time. A process that
//! cannot take the lock gets [`CircuitError::Open`], the same answer as when
//! the circuit is still cooling down.

use crate::circuit::CircuitBreaker;
use crate::errors::{CircuitError, LockError};
use crate::lock::DistributedLock;
use crate::state::Admission;
use std::fmt::Display;
use std::ops::Deref;
use tracing::debug;

/// Store-backed circuit breaker with a single-prober lock
///
/// Dereferences to the inner [`CircuitBreaker`] for state inspection and
/// administrative operations.
///
/// # Example
///
/// ```rust
/// use circuit_breakage::{CircuitBreaker, InMemoryStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::new());
/// let breaker = CircuitBreaker::builder("billing")
///     .failure_threshold(3)
///     .build_distributed(store)
///     .unwrap();
///
/// let result = breaker.call(|| Ok::<_, String>("charged"));
/// assert_eq!(result.unwrap(), "charged");
/// ```
#[derive(Debug)]
pub struct DistributedBreaker {
    inner: CircuitBreaker,
    lock: DistributedLock,
}

impl DistributedBreaker {
    pub(crate) fn new(inner: CircuitBreaker, lock: DistributedLock) -> Self {
        Self { inner, lock }
    }

    /// Execute a fallible operation with circuit breaker protection
    ///
    /// Same contract as [`CircuitBreaker::call`], except that a probe call
    /// additionally requires the half-open lock.
    pub fn call<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (admission, _) = self.inner.admit()?;
        match admission {
            Admission::Reject => Err(self.inner.open_error()),
            Admission::Pass => self.inner.execute(f),
            Admission::Probe => self.probe(f),
        }
    }

    fn probe<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let outcome = self.lock.with_lock(|| -> Result<T, CircuitError<E>> {
            // Re-check under the lock: the previous holder may have closed
            // the circuit or reopened it with a fresh timestamp.
            let (admission, status) = self.inner.admit()?;
            match admission {
                Admission::Reject => Err(self.inner.open_error()),
                Admission::Pass => self.inner.execute(f),
                Admission::Probe => {
                    self.inner.begin_probe(status)?;
                    self.inner.execute(f)
                }
            }
        });

        match outcome {
            Ok(result) => result,
            Err(LockError::Contended(key)) => {
                debug!(circuit = %self.inner.name(), %key, "probe already in progress elsewhere");
                Err(self.inner.open_error())
            }
            Err(LockError::Store(e)) => Err(CircuitError::Storage(e)),
        }
    }

    pub fn lock(&self) -> &DistributedLock {
        &self.lock
    }
}

impl Deref for DistributedBreaker {
    type Target = CircuitBreaker;

    fn deref(&self) -> &CircuitBreaker {
        &self.inner
    }
}
