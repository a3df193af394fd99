//! Trade lifecycle state machine (spec §4.3).
//!
//! Kept deliberately thin: the legal-edge table lives in
//! `trx_schemas::EventType::for_transition`, shared with everything that
//! needs to know the graph (the orchestrator, the audit reader, tests). This
//! module is the single place that turns "is this edge legal" into a hard
//! error rather than a silent no-op — the same contract the order-state
//! machine enforces for broker order state (`OmsOrder::apply`).

use trx_schemas::{EventType, TradeStatus};

use crate::error::ExecutionError;

/// Validates `from -> to` against the fixed lifecycle graph and returns the
/// event type that edge is audited as. Any pair not in the graph is rejected
/// — there is no default/fallthrough edge.
pub fn transition(from: TradeStatus, to: TradeStatus) -> Result<EventType, ExecutionError> {
    EventType::for_transition(from, to).ok_or(ExecutionError::StateMachine { from, to })
}
