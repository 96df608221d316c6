//! Breaker state model and transition rules
//!
//! `BreakerState` is plain data. Every transition the breaker performs is one
//! of the methods below, so in-process and store-backed storage apply exactly
//! the same rules.
//!
//! The status is a plain enum rather than a typestate machine because a
//! store-backed breaker must resume from whatever status the store holds,
//! including `Open` or `HalfOpen`.

use std::fmt;
use std::str::FromStr;

/// Circuit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Calls pass through
    #[default]
    Closed,
    /// Calls are rejected until the cooldown elapses
    Open,
    /// A probe call is checking whether the dependency recovered
    HalfOpen,
}

impl Status {
    /// Wire representation used by remote storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Closed => "closed",
            Status::Open => "open",
            Status::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status string is not one of the known literals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(Status::Closed),
            "open" => Ok(Status::Open),
            "half_open" => Ok(Status::HalfOpen),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Decision taken for an incoming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit is closed, invoke normally
    Pass,
    /// Cooldown elapsed or already half-open, invoke as a probe
    Probe,
    /// Circuit is open and cooling down
    Reject,
}

/// Snapshot of a circuit's mutable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakerState {
    pub status: Status,
    pub failure_count: u64,
    /// Epoch seconds of the last qualifying failure, 0 if there never was one
    pub last_failed_at: i64,
}

impl BreakerState {
    /// Decide how a call arriving at `now` is handled.
    ///
    /// `cooldown_secs` is the (possibly jittered) open duration.
    pub fn admission(&self, now: i64, cooldown_secs: f64) -> Admission {
        match self.status {
            Status::Closed => Admission::Pass,
            Status::HalfOpen => Admission::Probe,
            Status::Open if self.cooldown_elapsed(now, cooldown_secs) => Admission::Probe,
            Status::Open => Admission::Reject,
        }
    }

    pub fn cooldown_elapsed(&self, now: i64, cooldown_secs: f64) -> bool {
        now.saturating_sub(self.last_failed_at) as f64 >= cooldown_secs
    }

    /// Whether a qualifying failure bringing the count to `failure_count`
    /// must (re)open the circuit
    pub fn should_trip(&self, threshold: u64) -> bool {
        self.status == Status::HalfOpen || self.failure_count >= threshold
    }

    /// Apply a successful call. Returns the status before the transition.
    pub fn record_success(&mut self) -> Status {
        let previous = self.status;
        self.failure_count = 0;
        self.status = Status::Closed;
        previous
    }

    /// Apply a qualifying failure observed at `at`.
    ///
    /// Returns true if this failure moved the circuit into `Open`.
    pub fn record_failure(&mut self, at: i64, threshold: u64) -> bool {
        self.failure_count += 1;
        self.last_failed_at = at;

        if self.should_trip(threshold) {
            let tripped = self.status != Status::Open;
            self.status = Status::Open;
            tripped
        } else {
            false
        }
    }

    /// Administrative override. Entering `Closed` clears the failure count.
    pub fn force(&mut self, status: Status) {
        self.status = status;
        if status == Status::Closed {
            self.failure_count = 0;
        }
    }
}
