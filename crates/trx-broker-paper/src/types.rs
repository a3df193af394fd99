use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use trx_schemas::{OrderStatus, Side};

/// Internal bookkeeping for a simulated order. Distinct from
/// `trx_schemas::ExecutionOrder` — this is the broker's own view, not the
/// persisted domain record.
#[derive(Clone, Debug)]
pub(crate) struct OrderRecord {
    pub broker_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub requested_size: Decimal,
    pub filled_size: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PositionRecord {
    pub broker_position_id: String,
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
}
