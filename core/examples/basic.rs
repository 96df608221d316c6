//! Basic circuit breaker usage example

use circuit_breakage::{CircuitBreaker, CircuitError, ManualClock, Status};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== Circuit Breaker Basic Example ===\n");

    // A manual clock lets the example skip the cooldown instead of sleeping.
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let circuit = CircuitBreaker::builder("payment_api")
        .failure_threshold(3)
        .open_duration_secs(30.0)
        .call_timeout_secs(0.2)
        .clock(clock.clone())
        .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
        .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
        .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
        .build()
        .expect("valid configuration");

    println!("Initial state: {}\n", circuit.status().unwrap_or(Status::Closed));

    println!("--- Successful calls ---");
    for i in 1..=2 {
        match circuit.call(move || Ok::<_, String>(format!("Payment {}", i))) {
            Ok(result) => println!("✓ {}", result),
            Err(e) => println!("✗ Error: {}", e),
        }
    }

    println!("\n--- Triggering failures ---");
    let _ = circuit.call(|| Err::<String, _>("card declined".to_string()));
    let _ = circuit.call(|| Err::<String, _>("gateway error".to_string()));
    match circuit.call(|| {
        std::thread::sleep(Duration::from_secs(1));
        Ok::<_, String>("too late".to_string())
    }) {
        Err(CircuitError::Timeout { timeout, .. }) => println!("✗ timed out after {:?}", timeout),
        other => println!("unexpected: {:?}", other),
    }
    println!("Last error: {:?}", circuit.last_error());

    println!("\n--- Attempting call while open ---");
    match circuit.call(|| Ok::<_, String>("Should be rejected")) {
        Ok(_) => println!("✓ Success"),
        Err(e) => println!("✗ {}", e),
    }

    println!("\n--- After the cooldown ---");
    clock.advance(30);
    match circuit.call(|| Ok::<_, String>("Payment successful")) {
        Ok(result) => println!("✓ {}", result),
        Err(e) => println!("✗ {}", e),
    }
    println!("State: {}", circuit.status().unwrap_or(Status::Closed));
}
