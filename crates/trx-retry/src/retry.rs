use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};
use trx_config::{ErrorCategory, RetryConfig};

use crate::breaker::CircuitBreaker;

/// Outcome of a retry loop that never succeeded.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The circuit breaker was open and no attempt was made.
    CircuitOpen,
    /// All attempts permitted by the category's policy were exhausted.
    Exhausted { attempts: u32, last: E },
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::CircuitOpen => write!(f, "circuit breaker is open"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "exhausted {attempts} attempt(s), last error: {last}")
            }
        }
    }
}

impl<E: std::fmt::Display + std::fmt::Debug> std::error::Error for RetryError<E> {}

/// Full-jitter backoff: a uniformly random duration in `[0, delay]`. Spreads
/// out retries from many callers that failed at the same instant.
fn with_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let millis = delay.as_millis().min(u64::MAX as u128) as u64;
    let jittered = rand::thread_rng().gen_range(0..=millis);
    Duration::from_millis(jittered)
}

/// Runs `operation` under the category's retry policy (spec §4.10), optionally
/// gated by a circuit breaker (used for the `NETWORK` category). Non-retryable
/// categories (`AUTHENTICATION`, `DATA_VALIDATION`) get exactly one attempt.
pub async fn execute_with_retry<F, Fut, T, E>(
    category: ErrorCategory,
    retry_cfg: &RetryConfig,
    breaker: Option<&CircuitBreaker>,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let policy = retry_cfg.for_category(category);
    let max_attempts = if !category.is_retryable() {
        1
    } else {
        policy.map(|p| p.max_attempts.max(1)).unwrap_or(1)
    };

    let mut last_err: Option<E> = None;
    for attempt in 0..max_attempts {
        if let Some(cb) = breaker {
            if !cb.is_call_permitted() {
                return Err(RetryError::CircuitOpen);
            }
        }

        match operation().await {
            Ok(v) => {
                if let Some(cb) = breaker {
                    cb.record_success();
                }
                return Ok(v);
            }
            Err(e) => {
                if let Some(cb) = breaker {
                    cb.record_failure();
                }
                warn!(attempt, ?category, "operation failed");
                last_err = Some(e);

                if attempt + 1 < max_attempts {
                    if let Some(p) = policy {
                        let delay = with_jitter(p.backoff_for_attempt(attempt));
                        debug!(?delay, "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
        last: last_err.expect("loop runs at least once"),
    })
}
