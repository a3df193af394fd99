use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trx_schemas::{OrderStatus, OrderType, Side};

/// A request to place a new order at the venue (spec §4.1, §6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Two decimal places.
    pub size: Decimal,
    pub order_type: OrderType,
    /// Required for `LIMIT`, absent for `MARKET`. Five decimal places.
    pub price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// The broker's synchronous reply to a `place_order` call (spec §4.1).
/// A `FILLED` status here means the venue filled the order inline rather
/// than reporting it later via [`ExecutionReport`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub broker_order_id: String,
    pub status: OrderStatus,
    pub filled_price: Option<Decimal>,
    pub filled_size: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// An asynchronous fill notification delivered to an execution sink
/// (spec §4.1 `subscribe_executions`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub broker_order_id: String,
    /// Opaque venue-assigned identity for this specific fill, used for
    /// idempotent ingestion by the Order Manager (spec §4.4).
    pub execution_id: String,
    pub filled_price: Decimal,
    pub filled_size: Decimal,
    pub slippage: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Reply to `validate_account` (spec §4.1); doubles as a connectivity
/// heartbeat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin: Decimal,
    pub free_margin: Decimal,
    pub margin_level: Decimal,
}

/// A position as the venue reports it (spec §4.1 `get_open_positions`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub broker_position_id: String,
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
}
