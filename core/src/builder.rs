//! Builder API for ergonomic circuit breaker configuration

use crate::{
    MemoryStorage, StorageBackend,
    callbacks::Callbacks,
    circuit::{CircuitBreaker, Config},
    classifier::{Category, FailureClassifier, TripFilter},
    clock::{Clock, SystemClock},
    distributed::DistributedBreaker,
    errors::ConfigError,
    lock::DistributedLock,
    storage::RemoteStorage,
    store::KeyValueStore,
};
use std::sync::Arc;

/// Builder for creating circuit breakers with fluent API
pub struct CircuitBuilder {
    name: String,
    config: Config,
    storage: Option<Arc<dyn StorageBackend>>,
    failure_classifier: Option<Arc<dyn FailureClassifier>>,
    trip_filter: TripFilter,
    clock: Option<Arc<dyn Clock>>,
    callbacks: Callbacks,
}

impl CircuitBuilder {
    /// Create a new builder for a circuit with the given name
    ///
    /// For distributed breakers the name is also the shared breaker id that
    /// prefixes every store key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            storage: None,
            failure_classifier: None,
            trip_filter: TripFilter::default(),
            clock: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Replace the whole configuration, e.g. one deserialized from a file
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the number of qualifying failures that opens the circuit
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Set how long the circuit stays open before probing, in seconds
    pub fn open_duration_secs(mut self, seconds: f64) -> Self {
        self.config.open_duration_secs = seconds;
        self
    }

    /// Set the call deadline in seconds
    pub fn call_timeout_secs(mut self, seconds: f64) -> Self {
        self.config.call_timeout_secs = seconds;
        self
    }

    /// Set when a half-open probe lock is considered abandoned, in seconds
    ///
    /// Must be at least the call timeout, or a live probe could lose its
    /// lease to another process.
    pub fn lock_timeout_secs(mut self, seconds: f64) -> Self {
        self.config.lock_timeout_secs = Some(seconds);
        self
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: duration * (1 - jitter + rand * jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.config.jitter_factor = factor;
        self
    }

    /// Only failures in the listed categories count (may be called repeatedly)
    pub fn only_trip_on(mut self, category: Category) -> Self {
        self.trip_filter.only_trip_on.push(category);
        self
    }

    /// Failures in the listed categories never count, even if also allowed
    pub fn never_trip_on(mut self, category: Category) -> Self {
        self.trip_filter.never_trip_on.push(category);
        self
    }

    /// Set a failure classifier to filter which errors should trip the circuit
    ///
    /// A custom classifier replaces the `only_trip_on`/`never_trip_on` lists.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use circuit_breakage::{CircuitBreaker, PredicateClassifier};
    /// use std::sync::Arc;
    ///
    /// let circuit = CircuitBreaker::builder("api")
    ///     .failure_classifier(Arc::new(PredicateClassifier::new(|ctx| {
    ///         // Only trip on slow errors
    ///         ctx.duration > 1.0
    ///     })))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn failure_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.failure_classifier = Some(classifier);
        self
    }

    /// Set custom storage backend (ignored by `build_distributed`)
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the time source (defaults to the system clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set callback for when circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit closes
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Build the circuit breaker
    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        let storage = self
            .storage
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        self.finish(storage)
    }

    /// Build a breaker whose state lives in `store`, shared by every process
    /// that uses the same name
    pub fn build_distributed(
        self,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<DistributedBreaker, ConfigError> {
        let storage = Arc::new(RemoteStorage::new(Arc::clone(&store), &self.name));
        let lock_key = format!("{}/locks/half_open_retry", self.name);
        let clock = self.clock.clone().unwrap_or_else(|| Arc::new(SystemClock));

        let inner = self.finish(storage)?;
        let lock = DistributedLock::new(store, lock_key, inner.config().lock_timeout())
            .with_clock(clock);
        Ok(DistributedBreaker::new(inner, lock))
    }

    fn finish(self, storage: Arc<dyn StorageBackend>) -> Result<CircuitBreaker, ConfigError> {
        self.config.validate()?;

        let classifier = self
            .failure_classifier
            .unwrap_or_else(|| Arc::new(self.trip_filter));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(CircuitBreaker::from_parts(
            self.name,
            self.config,
            storage,
            classifier,
            clock,
            self.callbacks,
        ))
    }
}
