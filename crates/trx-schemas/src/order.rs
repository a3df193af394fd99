use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Side;

/// A venue-directed order type (spec §6 `OrderRequest`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MARKET" => Some(OrderType::Market),
            "LIMIT" => Some(OrderType::Limit),
            _ => None,
        }
    }
}

/// Lifecycle status of an `ExecutionOrder` (spec §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Filled => "FILLED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "FILLED" => Some(OrderStatus::Filled),
            "PARTIALLY_FILLED" => Some(OrderStatus::PartiallyFilled),
            "REJECTED" => Some(OrderStatus::Rejected),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// §4.4: "an order cannot regress from a terminal status."
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }
}

/// A venue-directed request to buy or sell (spec §3). A trade may spawn an
/// entry order and up to two bracket orders (SL/TP).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub order_id: Uuid,
    pub trade_id: Uuid,
    /// Absent until the broker acknowledges the order (spec §3).
    pub broker_order_id: Option<String>,
    pub side: Side,
    pub order_type: OrderType,
    pub requested_price: Option<Decimal>,
    pub requested_size: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionOrder {
    /// §3 invariant: an order cannot regress from a terminal status.
    pub fn can_transition(&self) -> bool {
        !self.status.is_terminal()
    }
}
