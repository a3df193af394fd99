use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fill or partial fill against an `ExecutionOrder` (spec §3).
///
/// Invariants enforced by the caller (`trx-execution::OrderManager`):
/// - `sum(filled sizes)` for a given order never exceeds the order's
///   requested size.
/// - `executed_at` is ≥ the parent order's `created_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: Uuid,
    pub order_id: Uuid,
    pub trade_id: Uuid,
    pub filled_price: Decimal,
    pub filled_size: Decimal,
    /// Absolute price difference between requested and filled price.
    pub slippage: Decimal,
    pub executed_at: DateTime<Utc>,
}
