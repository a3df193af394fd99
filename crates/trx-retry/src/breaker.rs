use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trx_config::CircuitBreakerConfig;

/// Three-state circuit breaker (spec §4.10): Closed (normal) -> Open
/// (tripped, fails fast) -> HalfOpen (admits a bounded number of probes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Per-endpoint circuit breaker. Read-locked for admission checks (`is_call_permitted`),
/// write-locked (via the atomics / `last_state_change` mutex) for state transitions.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: AtomicU32,
    half_open_successes: AtomicU32,
    last_state_change: Mutex<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            last_state_change: Mutex::new(Instant::now()),
        }
    }

    /// True if a call may proceed right now. Transitions Open -> HalfOpen
    /// as a side effect once `recovery_timeout_secs` has elapsed.
    pub fn is_call_permitted(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.last_state_change.lock().elapsed();
                if elapsed >= Duration::from_secs(self.config.recovery_timeout_secs) {
                    self.transition_to_half_open();
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Release);
            }
            CircuitState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.half_open_max_requests {
                    self.transition_to_closed();
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                // Any failure while probing immediately reopens.
                self.transition_to_open();
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_closed(&self) {
        info!("circuit breaker -> CLOSED");
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.half_open_successes.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
    }

    fn transition_to_open(&self) {
        warn!("circuit breaker -> OPEN");
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        self.half_open_successes.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
    }

    fn transition_to_half_open(&self) {
        debug!("circuit breaker -> HALF_OPEN");
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.half_open_successes.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
    }

    pub fn state(&self) -> CircuitState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.transition_to_closed();
    }

    pub fn force_open(&self) {
        self.transition_to_open();
    }
}

/// Circuit-breaker state keyed per broker endpoint (spec §5: "Circuit-breaker
/// state is per endpoint"). Endpoints are created lazily on first use.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, endpoint: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(endpoint) {
            return Arc::clone(existing);
        }
        let mut write = self.breakers.write();
        Arc::clone(
            write
                .entry(endpoint.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(config.clone()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout_secs: 0,
            half_open_max_requests: 2,
        }
    }

    #[test]
    fn starts_closed_and_permits_calls() {
        let cb = CircuitBreaker::new(config());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.is_call_permitted());
    }

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(config());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_call_permitted());
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let cb = CircuitBreaker::new(config());
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // recovery_timeout_secs = 0, so the next admission check transitions us.
        assert!(cb.is_call_permitted());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new(config());
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_call_permitted());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn registry_returns_independent_breakers_per_endpoint() {
        let registry = CircuitBreakerRegistry::new();
        let cfg = config();
        let a = registry.get_or_create("broker-a", &cfg);
        let b = registry.get_or_create("broker-b", &cfg);
        a.record_failure();
        a.record_failure();
        a.record_failure();
        assert_eq!(a.state(), CircuitState::Open);
        assert_eq!(b.state(), CircuitState::Closed);

        let a_again = registry.get_or_create("broker-a", &cfg);
        assert_eq!(a_again.state(), CircuitState::Open, "same endpoint must share state");
    }
}
