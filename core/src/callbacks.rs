//! Hooks fired when this process moves a circuit into a new status

use crate::state::Status;
use std::sync::Arc;

pub type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks for circuit breaker transitions
///
/// Hooks receive the circuit name. In the distributed breaker only the
/// process that performed a transition fires its hook.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<Hook>,
    pub on_close: Option<Hook>,
    pub on_half_open: Option<Hook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the hook registered for entering `status`
    pub fn trigger(&self, status: Status, circuit: &str) {
        let hook = match status {
            Status::Open => &self.on_open,
            Status::Closed => &self.on_close,
            Status::HalfOpen => &self.on_half_open,
        };
        if let Some(callback) = hook {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_trigger_dispatches_by_status() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str| -> Hook {
            let seen = Arc::clone(&seen);
            Arc::new(move |name: &str| seen.lock().unwrap().push(format!("{label}:{name}")))
        };

        let callbacks = Callbacks {
            on_open: Some(record("open")),
            on_close: Some(record("close")),
            on_half_open: None,
        };

        callbacks.trigger(Status::Open, "api");
        callbacks.trigger(Status::HalfOpen, "api");
        callbacks.trigger(Status::Closed, "api");

        assert_eq!(*seen.lock().unwrap(), vec!["open:api", "close:api"]);
    }
}
