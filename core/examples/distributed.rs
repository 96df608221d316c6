//! Two "processes" sharing one circuit through a key-value store
//!
//! Both breakers point at the same `InMemoryStore`; with the `redis` feature
//! the same code works against `RedisStore::open("redis://127.0.0.1/")`.

use circuit_breakage::{CircuitBreaker, InMemoryStore, KeyValueStore, ManualClock};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let worker = |label: &'static str| {
        let breaker = CircuitBreaker::builder("inventory")
            .failure_threshold(2)
            .open_duration_secs(60.0)
            .clock(clock.clone())
            .on_open(move |name| println!("[{label}] '{name}' opened"))
            .build_distributed(store.clone())
            .expect("valid configuration");
        (label, breaker)
    };
    let (a_label, a) = worker("a");
    let (b_label, b) = worker("b");

    let _ = a.call(|| Err::<(), _>("timeout talking to inventory"));
    let _ = b.call(|| Err::<(), _>("timeout talking to inventory"));
    println!("[{a_label}] sees open: {}", a.is_open());

    clock.advance(60);

    // `a` is probing right now; `b` is refused exactly as if still cooling down.
    let probe = a.lock().try_acquire().expect("lock is free");
    println!("[{b_label}] while {a_label} probes: {:?}", b.call(|| Ok::<_, String>(())));
    drop(probe);

    println!("[{b_label}] probe: {:?}", b.call(|| Ok::<_, String>("in stock")));
    println!("[{a_label}] sees closed: {}", a.is_closed());

    for key in ["state", "failure_count", "last_failed"] {
        let full = format!("inventory/attrs/{key}");
        println!("{full} = {:?}", store.get(&full).ok().flatten());
    }
}
