//! trx-retry
//!
//! Error classification, retry/backoff and the per-endpoint circuit breaker
//! (spec §4.10). `trx-config::retry` owns the policy shapes loaded from YAML;
//! this crate owns the runtime state machine and the executor that applies it.

mod breaker;
mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerRegistry, CircuitState};
pub use retry::{execute_with_retry, RetryError};
