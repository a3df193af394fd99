use thiserror::Error;
use trx_schemas::TradeStatus;
use uuid::Uuid;

/// Closed error taxonomy for the execution engine (spec §7). Every variant
/// is mapped to one of three propagation policies:
///
/// - recovered locally: `UnknownOrder`, `DuplicateEvent` — logged and
///   swallowed by the caller, never bubble past the order manager.
/// - surfaced to caller: `Validation`, `StateMachine`, `Broker`,
///   `ReconciliationRequired` — returned from `process_signal`/`cancel_trade`
///   as part of the result, not a panic.
/// - fatal, aborts the process: `DataIntegrity` — a persisted invariant
///   (spec §8 I1-I8) was found violated; continuing would compound it.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("risk validation rejected the signal: {0}")]
    RiskRejected(String),

    #[error("invalid transition: {from:?} -> {to:?}")]
    StateMachine { from: TradeStatus, to: TradeStatus },

    #[error(transparent)]
    Broker(#[from] trx_broker::BrokerError),

    #[error("operation timed out")]
    Timeout,

    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("closure is durable at the broker but not in storage, reconciliation required: {0}")]
    ReconciliationRequired(String),

    #[error("signal {0} not found")]
    SignalNotFound(Uuid),

    #[error("trade {0} not found")]
    TradeNotFound(Uuid),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ExecutionError {
    /// Process exit code for the admin CLI surface (spec §6): 0 success is
    /// never constructed here, so the enum only covers 1-4.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionError::RiskRejected(_) => 1,
            ExecutionError::Broker(_) => 2,
            ExecutionError::StateMachine { .. }
            | ExecutionError::DataIntegrity(_)
            | ExecutionError::ReconciliationRequired(_)
            | ExecutionError::SignalNotFound(_)
            | ExecutionError::TradeNotFound(_) => 3,
            ExecutionError::Timeout | ExecutionError::Storage(_) => 4,
        }
    }
}
