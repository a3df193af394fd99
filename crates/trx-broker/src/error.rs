use thiserror::Error;

/// Failure modes surfaced by a [`crate::BrokerAdapter`] (spec §4.1, §4.9).
/// Kept as a closed enum so callers (the error classifier in `trx-retry`,
/// the orchestrator) can match on kind rather than string-sniff.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("call timed out")]
    Timeout,

    #[error("broker rejected request: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("order already in a terminal state: {0}")]
    AlreadyTerminal(String),

    #[error("invalid request: {0}")]
    DataValidation(String),

    #[error("broker-side system error: {0}")]
    System(String),
}

impl BrokerError {
    /// Maps to the error-classifier categories (spec §4.10). `trx-retry`
    /// drives retry/backoff/circuit-breaker policy off this, not off the
    /// Rust type name.
    pub fn category(&self) -> trx_config::ErrorCategory {
        use trx_config::ErrorCategory::*;
        match self {
            BrokerError::Authentication(_) => Authentication,
            BrokerError::RateLimit(_) => RateLimit,
            BrokerError::Network(_) | BrokerError::Connection(_) => Network,
            BrokerError::Timeout => Timeout,
            BrokerError::DataValidation(_) => DataValidation,
            BrokerError::Rejected(_) | BrokerError::NotFound(_) | BrokerError::AlreadyTerminal(_) => {
                DataValidation
            }
            BrokerError::System(_) => System,
        }
    }
}
