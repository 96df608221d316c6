//! Circuit breaker call orchestration
//!
//! A call is admitted (or rejected) from the stored state, run on a worker
//! thread under the call deadline, classified, and recorded back into the
//! storage backend.

use crate::{
    StorageBackend,
    callbacks::Callbacks,
    classifier::{Failure, FailureClassifier, FailureContext},
    clock::Clock,
    errors::{CircuitError, ConfigError, StoreError},
    state::{Admission, BreakerState, Status},
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of qualifying failures that opens the circuit
    pub failure_threshold: u64,

    /// Seconds the circuit stays open before a probe call is let through.
    /// Failure times are whole epoch seconds, so a fractional cooldown is
    /// effectively rounded to second resolution.
    pub open_duration_secs: f64,

    /// Seconds to wait for the operation before abandoning it
    pub call_timeout_secs: f64,

    /// Seconds after which a half-open probe lock is considered abandoned.
    /// Defaults to `call_timeout_secs + 10`; must not be shorter than the
    /// call timeout.
    pub lock_timeout_secs: Option<f64>,

    /// Jitter factor for the open duration (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: duration * (1 - jitter + rand * jitter)
    ///
    /// The cooldown is sampled again on every admission check, so under steady
    /// traffic the circuit tends to probe near the lower bound.
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_secs: 300.0,
            call_timeout_secs: 10.0,
            lock_timeout_secs: None,
            jitter_factor: 0.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }

        let durations = [
            ("open_duration_secs", self.open_duration_secs),
            ("call_timeout_secs", self.call_timeout_secs),
            ("lock_timeout_secs", self.effective_lock_timeout_secs()),
        ];
        for (field, value) in durations {
            if !(value > 0.0 && Duration::try_from_secs_f64(value).is_ok()) {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }

        if self.effective_lock_timeout_secs() < self.call_timeout_secs {
            return Err(ConfigError::LockTimeoutTooShort {
                lock_timeout: self.effective_lock_timeout_secs(),
                call_timeout: self.call_timeout_secs,
            });
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitter(self.jitter_factor));
        }
        Ok(())
    }

    /// Call deadline; saturates at `Duration::MAX` for out-of-range values
    pub fn call_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.call_timeout_secs).unwrap_or(Duration::MAX)
    }

    /// Probe lock lease; saturates at `Duration::MAX` for out-of-range values
    pub fn lock_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.effective_lock_timeout_secs()).unwrap_or(Duration::MAX)
    }

    fn effective_lock_timeout_secs(&self) -> f64 {
        self.lock_timeout_secs
            .unwrap_or(self.call_timeout_secs + 10.0)
    }

    /// Open duration for one admission check, with jitter applied
    pub(crate) fn cooldown_secs(&self) -> f64 {
        if self.jitter_factor > 0.0 {
            let duration_ms = (self.open_duration_secs * 1000.0) as u64;
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms: duration_ms,
                multiplier: 1.0,
                max_delay_ms: duration_ms,
            };
            let cooldown_ms = policy.calculate_delay(1, self.jitter_factor);
            (cooldown_ms as f64) / 1000.0
        } else {
            self.open_duration_secs
        }
    }
}

/// Deadline expired before the worker produced a result
struct Elapsed;

/// Run `f` on a worker thread and wait for it at most `timeout`.
///
/// On expiry the worker is detached: it keeps running and its result is
/// dropped. A panic inside `f` is resumed on the calling thread.
fn run_with_deadline<T, E, F>(f: F, timeout: Duration) -> Result<Result<T, E>, Elapsed>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let worker = thread::spawn(move || {
        // The receiver is gone if the caller already gave up.
        let _ = tx.send(f());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => Ok(result),
        Err(RecvTimeoutError::Timeout) => Err(Elapsed),
        Err(RecvTimeoutError::Disconnected) => match worker.join() {
            Err(payload) => panic::resume_unwind(payload),
            Ok(()) => unreachable!("call worker exited without sending a result"),
        },
    }
}

/// Circuit breaker public API
///
/// Calls take `&self`; share a breaker between threads with an `Arc`.
pub struct CircuitBreaker {
    name: String,
    config: Config,
    storage: Arc<dyn StorageBackend>,
    classifier: Arc<dyn FailureClassifier>,
    clock: Arc<dyn Clock>,
    callbacks: Callbacks,
    last_error: Mutex<Option<String>>,
}

impl CircuitBreaker {
    /// Create an in-memory circuit breaker (use builder() for more options)
    pub fn new(name: impl Into<String>, config: Config) -> Result<Self, ConfigError> {
        Self::builder(name).config(config).build()
    }

    /// Create a new circuit breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::CircuitBuilder {
        crate::builder::CircuitBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: String,
        config: Config,
        storage: Arc<dyn StorageBackend>,
        classifier: Arc<dyn FailureClassifier>,
        clock: Arc<dyn Clock>,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            name,
            config,
            storage,
            classifier,
            clock,
            callbacks,
            last_error: Mutex::new(None),
        }
    }

    /// Execute a fallible operation with circuit breaker protection
    ///
    /// The operation runs on a worker thread so that the deadline can be
    /// enforced; bind any context it needs by moving it into the closure.
    ///
    /// # Errors
    ///
    /// - [`CircuitError::Open`] if the circuit is open and cooling down; the
    ///   operation is not invoked
    /// - [`CircuitError::Timeout`] if the operation outlived `call_timeout_secs`
    /// - [`CircuitError::Execution`] with the operation's own error
    /// - [`CircuitError::Storage`] if the current state could not be read
    pub fn call<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (admission, status) = self.admit()?;
        match admission {
            Admission::Reject => Err(self.open_error()),
            Admission::Pass => self.execute(f),
            Admission::Probe => {
                self.begin_probe(status)?;
                self.execute(f)
            }
        }
    }

    /// Decide what to do with a call arriving now
    pub(crate) fn admit(&self) -> Result<(Admission, Status), StoreError> {
        let state = self.storage.load()?;
        let admission = state.admission(self.clock.now(), self.config.cooldown_secs());
        debug!(circuit = %self.name, status = %state.status, ?admission, "call admission");
        Ok((admission, state.status))
    }

    pub(crate) fn open_error<E>(&self) -> CircuitError<E> {
        CircuitError::Open {
            circuit: self.name.clone(),
        }
    }

    /// Move an open circuit to half-open ahead of its probe call
    pub(crate) fn begin_probe(&self, status: Status) -> Result<(), StoreError> {
        if status == Status::Open {
            self.storage.set_status(Status::HalfOpen)?;
            info!(circuit = %self.name, "circuit half-open, probing");
            self.callbacks.trigger(Status::HalfOpen, &self.name);
        }
        Ok(())
    }

    /// Invoke the operation under the deadline and record the outcome
    pub(crate) fn execute<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let timeout = self.config.call_timeout();
        let start = Instant::now();

        match run_with_deadline(f, timeout) {
            Ok(Ok(value)) => {
                self.handle_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                let failure = Failure::Error(&e);
                if self.is_tripping(failure, start) {
                    self.handle_failure(e.to_string());
                }
                Err(CircuitError::Execution(e))
            }
            Err(Elapsed) => {
                if self.is_tripping(Failure::Timeout, start) {
                    self.handle_failure(format!("call timed out after {timeout:?}"));
                }
                Err(CircuitError::Timeout {
                    circuit: self.name.clone(),
                    timeout,
                })
            }
        }
    }

    fn is_tripping(&self, failure: Failure<'_>, start: Instant) -> bool {
        let ctx = FailureContext {
            circuit_name: &self.name,
            failure,
            duration: start.elapsed().as_secs_f64(),
        };
        self.classifier.should_trip(&ctx)
    }

    // Bookkeeping failures are logged rather than returned so the caller
    // always sees the operation's own outcome.

    fn handle_success(&self) {
        match self.storage.record_success() {
            Ok(Status::Closed) => {}
            Ok(_) => {
                info!(circuit = %self.name, "circuit closed");
                self.callbacks.trigger(Status::Closed, &self.name);
            }
            Err(e) => warn!(circuit = %self.name, error = %e, "failed to record success"),
        }
    }

    fn handle_failure(&self, message: String) {
        let tripped = self
            .storage
            .record_failure(self.clock.now(), self.config.failure_threshold);
        *self.last_error_slot() = Some(message);

        match tripped {
            Ok(true) => {
                info!(circuit = %self.name, "circuit opened");
                self.callbacks.trigger(Status::Open, &self.name);
            }
            Ok(false) => {}
            Err(e) => warn!(circuit = %self.name, error = %e, "failed to record failure"),
        }
    }

    fn last_error_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current state snapshot
    pub fn state(&self) -> Result<BreakerState, StoreError> {
        self.storage.load()
    }

    pub fn status(&self) -> Result<Status, StoreError> {
        Ok(self.storage.load()?.status)
    }

    /// Check if circuit is open (false if the state cannot be read)
    pub fn is_open(&self) -> bool {
        matches!(self.status(), Ok(Status::Open))
    }

    /// Check if circuit is closed (false if the state cannot be read)
    pub fn is_closed(&self) -> bool {
        matches!(self.status(), Ok(Status::Closed))
    }

    /// Check if circuit is half-open (false if the state cannot be read)
    pub fn is_half_open(&self) -> bool {
        matches!(self.status(), Ok(Status::HalfOpen))
    }

    /// Rendering of the last failure that counted toward the threshold
    pub fn last_error(&self) -> Option<String> {
        self.last_error_slot().clone()
    }

    /// Force the circuit into `status`, bypassing the normal transitions.
    ///
    /// Forcing `Closed` also clears the failure count.
    pub fn force_state(&self, status: Status) -> Result<(), StoreError> {
        self.storage.force(status)?;
        info!(circuit = %self.name, %status, "circuit state forced");
        Ok(())
    }

    /// Reset circuit to its initial state
    pub fn reset(&self) -> Result<(), StoreError> {
        self.storage.clear()?;
        *self.last_error_slot() = None;
        Ok(())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("classifier", &self.classifier)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Category;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("very specific")]
    struct VerySpecificError;

    #[derive(Debug, Error)]
    enum AppError {
        #[error("not found")]
        NotFound,
        #[error("boom")]
        Boom,
    }

    fn breaker_with_clock(threshold: u64) -> (Arc<ManualClock>, CircuitBreaker) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let circuit = CircuitBreaker::builder("test")
            .failure_threshold(threshold)
            .clock(clock.clone())
            .build()
            .unwrap();
        (clock, circuit)
    }

    fn fail(circuit: &CircuitBreaker) -> Result<(), CircuitError<&'static str>> {
        circuit.call(|| Err::<(), _>("some error"))
    }

    #[test]
    fn test_circuit_breaker_creation() {
        let circuit = CircuitBreaker::new("test", Config::default()).unwrap();

        assert!(circuit.is_closed());
        assert!(!circuit.is_open());
        assert_eq!(circuit.state().unwrap(), BreakerState::default());
        assert_eq!(circuit.last_error(), None);
    }

    #[test]
    fn test_call_returns_value_when_closed() {
        let (_, circuit) = breaker_with_clock(5);
        let arg = String::from("This is an argument.");

        let result = circuit.call(move || Ok::<_, String>(arg));
        assert_eq!(result.unwrap(), "This is an argument.");
    }

    #[test]
    fn test_circuit_opens_after_threshold() {
        let (_, circuit) = breaker_with_clock(3);

        let _ = fail(&circuit);
        let _ = fail(&circuit);
        assert!(circuit.is_closed());
        assert_eq!(circuit.state().unwrap().failure_count, 2);

        let _ = fail(&circuit);
        assert!(circuit.is_open());
        assert_eq!(circuit.state().unwrap().failure_count, 3);
    }

    #[test]
    fn test_failure_records_time_and_error_and_is_returned() {
        let (clock, circuit) = breaker_with_clock(5);

        let err = fail(&circuit).unwrap_err();
        assert!(matches!(err, CircuitError::Execution("some error")));

        let state = circuit.state().unwrap();
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.last_failed_at, clock.now());
        assert_eq!(circuit.last_error().as_deref(), Some("some error"));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let (_, circuit) = breaker_with_clock(5);
        for _ in 0..3 {
            let _ = fail(&circuit);
        }

        circuit.call(|| Ok::<_, &str>(())).unwrap();
        assert_eq!(circuit.state().unwrap().failure_count, 0);
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_open_circuit_rejects_without_invoking() {
        let (clock, circuit) = breaker_with_clock(1);
        let _ = fail(&circuit);
        let before = circuit.state().unwrap();

        clock.advance(270);
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let err = circuit
            .call(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            })
            .unwrap_err();

        assert!(err.is_open());
        assert_eq!(err.to_string(), "Circuit 'test' is open");
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(circuit.state().unwrap(), before);
    }

    #[test]
    fn test_threshold_one_scenario() {
        let (clock, circuit) = breaker_with_clock(1);

        let _ = fail(&circuit);
        assert!(circuit.is_open());
        assert!(fail(&circuit).unwrap_err().is_open());

        clock.advance(301);
        assert_eq!(circuit.call(|| Ok::<_, &str>("probed")).unwrap(), "probed");
    }

    #[test]
    fn test_successful_probe_closes() {
        let (clock, circuit) = breaker_with_clock(2);
        let _ = fail(&circuit);
        let _ = fail(&circuit);
        assert!(circuit.is_open());

        clock.advance(300);
        circuit.call(|| Ok::<_, &str>(())).unwrap();

        let state = circuit.state().unwrap();
        assert_eq!(state.status, Status::Closed);
        assert_eq!(state.failure_count, 0);
    }

    #[test]
    fn test_failed_probe_reopens_with_new_timestamp() {
        let (clock, circuit) = breaker_with_clock(2);
        let _ = fail(&circuit);
        let _ = fail(&circuit);

        clock.advance(330);
        let _ = fail(&circuit);

        let state = circuit.state().unwrap();
        assert_eq!(state.status, Status::Open);
        assert_eq!(state.last_failed_at, clock.now());
        assert!(fail(&circuit).unwrap_err().is_open());
    }

    #[test]
    fn test_half_open_invokes_operation() {
        let (_, circuit) = breaker_with_clock(5);
        circuit.force_state(Status::HalfOpen).unwrap();

        assert_eq!(circuit.call(|| Ok::<_, &str>(7)).unwrap(), 7);
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_non_qualifying_probe_failure_leaves_half_open() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let circuit = CircuitBreaker::builder("filtered")
            .failure_threshold(1)
            .only_trip_on(Category::of::<VerySpecificError>())
            .clock(clock.clone())
            .build()
            .unwrap();

        let _ = circuit.call(|| Err::<(), _>(VerySpecificError));
        assert!(circuit.is_open());

        clock.advance(300);
        let err = circuit.call(|| Err::<(), _>(AppError::Boom)).unwrap_err();
        assert!(matches!(err, CircuitError::Execution(AppError::Boom)));

        let state = circuit.state().unwrap();
        assert_eq!(state.status, Status::HalfOpen);
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.last_failed_at, 1_700_000_000);

        circuit.call(|| Ok::<_, AppError>(())).unwrap();
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_call_times_out() {
        let circuit = CircuitBreaker::builder("slow")
            .call_timeout_secs(0.1)
            .build()
            .unwrap();

        let started = Instant::now();
        let err = circuit
            .call(|| {
                thread::sleep(Duration::from_secs(2));
                Ok::<_, &str>(())
            })
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(circuit.state().unwrap().failure_count, 1);
        assert!(circuit.last_error().unwrap().contains("timed out"));
    }

    #[test]
    fn test_only_trip_on_ignores_other_errors() {
        let circuit = CircuitBreaker::builder("filtered")
            .only_trip_on(Category::of::<VerySpecificError>())
            .build()
            .unwrap();

        let err = circuit.call(|| Err::<(), _>(AppError::Boom)).unwrap_err();
        assert!(matches!(err, CircuitError::Execution(AppError::Boom)));
        assert_eq!(circuit.state().unwrap(), BreakerState::default());
        assert_eq!(circuit.last_error(), None);

        let _ = circuit.call(|| Err::<(), _>(VerySpecificError));
        assert_eq!(circuit.state().unwrap().failure_count, 1);
        assert_eq!(circuit.last_error().as_deref(), Some("very specific"));
    }

    #[test]
    fn test_only_trip_on_excludes_timeouts_unless_listed() {
        let circuit = CircuitBreaker::builder("filtered")
            .call_timeout_secs(0.05)
            .only_trip_on(Category::of::<VerySpecificError>())
            .build()
            .unwrap();

        let err = circuit
            .call(|| {
                thread::sleep(Duration::from_millis(500));
                Ok::<_, VerySpecificError>(())
            })
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(circuit.state().unwrap().failure_count, 0);
    }

    #[test]
    fn test_never_trip_on_excludes_errors() {
        let circuit = CircuitBreaker::builder("filtered")
            .never_trip_on(Category::of::<VerySpecificError>())
            .build()
            .unwrap();

        let _ = circuit.call(|| Err::<(), _>(VerySpecificError));
        assert_eq!(circuit.state().unwrap().failure_count, 0);

        let _ = circuit.call(|| Err::<(), _>(AppError::Boom));
        assert_eq!(circuit.state().unwrap().failure_count, 1);
    }

    #[test]
    fn test_overlapping_lists_deny_wins() {
        let circuit = CircuitBreaker::builder("filtered")
            .only_trip_on(Category::of::<AppError>())
            .never_trip_on(Category::matching::<AppError, _>("not_found", |e| {
                matches!(e, AppError::NotFound)
            }))
            .build()
            .unwrap();

        let err = circuit.call(|| Err::<(), _>(AppError::NotFound)).unwrap_err();
        assert!(matches!(err, CircuitError::Execution(AppError::NotFound)));
        assert_eq!(circuit.state().unwrap().failure_count, 0);
    }

    #[test]
    fn test_concurrent_failures_are_all_counted() {
        let circuit = Arc::new(
            CircuitBreaker::builder("shared")
                .failure_threshold(100)
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let circuit = Arc::clone(&circuit);
                thread::spawn(move || {
                    let _ = circuit.call(|| Err::<(), _>("error"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(circuit.state().unwrap().failure_count, 10);
    }

    #[test]
    fn test_panic_propagates_without_counting() {
        let (_, circuit) = breaker_with_clock(1);

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            circuit.call(|| -> Result<(), &'static str> { panic!("operation panicked") })
        }));

        assert!(result.is_err());
        assert!(circuit.is_closed());
        assert_eq!(circuit.state().unwrap().failure_count, 0);
    }

    #[test]
    fn test_force_state_and_reset() {
        let (_, circuit) = breaker_with_clock(5);
        let _ = fail(&circuit);

        circuit.force_state(Status::Open).unwrap();
        assert!(circuit.is_open());

        circuit.force_state(Status::Closed).unwrap();
        assert_eq!(circuit.state().unwrap().failure_count, 0);

        let _ = fail(&circuit);
        circuit.reset().unwrap();
        assert_eq!(circuit.state().unwrap(), BreakerState::default());
        assert_eq!(circuit.last_error(), None);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(Config::default().validate(), Ok(()));

        let zero = Config {
            failure_threshold: 0,
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroFailureThreshold));

        let negative = Config {
            call_timeout_secs: -1.0,
            ..Default::default()
        };
        assert_eq!(
            negative.validate(),
            Err(ConfigError::InvalidDuration {
                field: "call_timeout_secs",
                value: -1.0,
            })
        );

        let jitter = Config {
            jitter_factor: 1.5,
            ..Default::default()
        };
        assert_eq!(jitter.validate(), Err(ConfigError::InvalidJitter(1.5)));

        for huge in [1e20, f64::MAX, f64::INFINITY] {
            let no_deadline = Config {
                call_timeout_secs: huge,
                ..Default::default()
            };
            assert!(matches!(
                no_deadline.validate(),
                Err(ConfigError::InvalidDuration {
                    field: "call_timeout_secs",
                    ..
                })
            ));
        }

        let short_lease = Config {
            call_timeout_secs: 30.0,
            lock_timeout_secs: Some(5.0),
            ..Default::default()
        };
        assert_eq!(
            short_lease.validate(),
            Err(ConfigError::LockTimeoutTooShort {
                lock_timeout: 5.0,
                call_timeout: 30.0,
            })
        );
    }

    #[test]
    fn test_out_of_range_timeouts_saturate() {
        let config = Config {
            call_timeout_secs: 1e20,
            ..Default::default()
        };

        assert_eq!(config.call_timeout(), Duration::MAX);
        assert_eq!(config.lock_timeout(), Duration::MAX);
        assert!(CircuitBreaker::builder("x").call_timeout_secs(1e20).build().is_err());
    }

    #[test]
    fn test_lock_timeout_defaults_to_call_timeout_plus_ten() {
        assert_eq!(Config::default().lock_timeout(), Duration::from_secs(20));

        let explicit = Config {
            lock_timeout_secs: Some(45.0),
            ..Default::default()
        };
        assert_eq!(explicit.lock_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_jittered_cooldown_stays_within_bounds() {
        let config = Config {
            open_duration_secs: 100.0,
            jitter_factor: 0.5,
            ..Default::default()
        };

        for _ in 0..20 {
            let cooldown = config.cooldown_secs();
            assert!((50.0..=100.0).contains(&cooldown), "cooldown {cooldown}");
        }
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"failure_threshold": 2, "call_timeout_secs": 0.5}"#).unwrap();

        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.call_timeout(), Duration::from_millis(500));
        assert_eq!(config.open_duration_secs, 300.0);
        assert_eq!(config.lock_timeout_secs, None);
    }
}
