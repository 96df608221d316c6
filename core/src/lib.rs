//! circuit-breakage - Circuit breaker with call deadlines and shared state
//!
//! This crate provides:
//! - A three-state circuit breaker (Closed → Open → HalfOpen) that counts
//!   consecutive qualifying failures and fails fast while open
//! - A deadline on every protected call; expiry is reported as a timeout and
//!   classified like any other failure
//! - Allow/deny lists of failure categories, with the deny list taking priority
//! - A distributed variant that keeps state in a shared key-value store and
//!   lets only one process at a time probe a recovering dependency
//!
//! # Example
//!
//! ```rust
//! use circuit_breakage::{CircuitBreaker, CircuitError};
//!
//! let circuit = CircuitBreaker::builder("my_service")
//!     .failure_threshold(5)
//!     .open_duration_secs(60.0)
//!     .call_timeout_secs(2.0)
//!     .on_open(|name| println!("Circuit {} opened!", name))
//!     .build()
//!     .unwrap();
//!
//! // Execute with circuit protection
//! let result = circuit.call(|| {
//!     // Your service call here
//!     Ok::<_, String>("success")
//! });
//! assert_eq!(result.unwrap(), "success");
//!
//! match circuit.call(|| Err::<(), _>("refused".to_string())) {
//!     Err(CircuitError::Open { .. }) => println!("skipping call, circuit open"),
//!     Err(CircuitError::Timeout { .. }) => println!("dependency is slow"),
//!     Err(e) => println!("call failed: {}", e),
//!     Ok(()) => {}
//! }
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod classifier;
pub mod clock;
pub mod distributed;
pub mod errors;
pub mod lock;
#[cfg(feature = "redis")]
pub mod redis;
pub mod state;
pub mod storage;
pub mod store;

pub use builder::CircuitBuilder;
pub use circuit::{CircuitBreaker, Config};
pub use classifier::{
    Category, DefaultClassifier, Failure, FailureClassifier, FailureContext, PredicateClassifier,
    TripFilter,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use distributed::DistributedBreaker;
pub use errors::{CircuitError, ConfigError, LockError, StoreError};
pub use lock::{DistributedLock, LockGuard};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use state::{Admission, BreakerState, Status};
pub use storage::{MemoryStorage, RemoteStorage, StorageBackend};
pub use store::{InMemoryStore, KeyValueStore};
