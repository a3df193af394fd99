use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Broker-error classification driving retry eligibility (spec §4.10).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    DataValidation,
    Transient,
    System,
}

impl ErrorCategory {
    /// AUTHENTICATION and DATA_VALIDATION are never retried (spec §4.10):
    /// retrying them can't change the outcome without external remediation.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::Authentication | ErrorCategory::DataValidation)
    }
}

/// Retry policy for one error category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryCategoryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryCategoryConfig {
    /// Full jitter exponential backoff, capped at `max_delay_ms`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }
}

/// Per-category retry configuration (spec §4.10, §6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub categories: BTreeMap<ErrorCategory, RetryCategoryConfig>,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            ErrorCategory::Network,
            RetryCategoryConfig { max_attempts: 5, base_delay_ms: 200, max_delay_ms: 10_000 },
        );
        categories.insert(
            ErrorCategory::Timeout,
            RetryCategoryConfig { max_attempts: 3, base_delay_ms: 500, max_delay_ms: 10_000 },
        );
        categories.insert(
            ErrorCategory::RateLimit,
            RetryCategoryConfig { max_attempts: 5, base_delay_ms: 1_000, max_delay_ms: 30_000 },
        );
        categories.insert(
            ErrorCategory::Transient,
            RetryCategoryConfig { max_attempts: 3, base_delay_ms: 250, max_delay_ms: 5_000 },
        );
        categories.insert(
            ErrorCategory::System,
            RetryCategoryConfig { max_attempts: 1, base_delay_ms: 0, max_delay_ms: 0 },
        );
        RetryConfig { categories, circuit_breaker: CircuitBreakerConfig::default() }
    }
}

impl RetryConfig {
    pub fn for_category(&self, cat: ErrorCategory) -> Option<&RetryCategoryConfig> {
        self.categories.get(&cat)
    }
}

/// Three-state circuit breaker thresholds guarding the broker adapter (spec §4.10).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            failure_threshold: 5,
            recovery_timeout_secs: 30,
            half_open_max_requests: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_validation_errors_never_retry() {
        assert!(!ErrorCategory::Authentication.is_retryable());
        assert!(!ErrorCategory::DataValidation.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let c = RetryCategoryConfig { max_attempts: 5, base_delay_ms: 200, max_delay_ms: 1_000 };
        assert_eq!(c.backoff_for_attempt(0), Duration::from_millis(200));
        assert_eq!(c.backoff_for_attempt(10), Duration::from_millis(1_000));
    }

    #[test]
    fn default_circuit_breaker_matches_spec() {
        let c = CircuitBreakerConfig::default();
        assert_eq!(c.failure_threshold, 5);
        assert_eq!(c.recovery_timeout_secs, 30);
        assert_eq!(c.half_open_max_requests, 3);
    }
}
