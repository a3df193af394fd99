use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::trade::TradeStatus;

/// Append-only event type for a trade's lifecycle (spec §3, §4.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    Validated,
    OrderSent,
    PartialFill,
    Filled,
    Opened,
    TpHit,
    SlHit,
    ManualClose,
    Error,
    Closed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "CREATED",
            EventType::Validated => "VALIDATED",
            EventType::OrderSent => "ORDER_SENT",
            EventType::PartialFill => "PARTIAL_FILL",
            EventType::Filled => "FILLED",
            EventType::Opened => "OPENED",
            EventType::TpHit => "TP_HIT",
            EventType::SlHit => "SL_HIT",
            EventType::ManualClose => "MANUAL_CLOSE",
            EventType::Error => "ERROR",
            EventType::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(EventType::Created),
            "VALIDATED" => Some(EventType::Validated),
            "ORDER_SENT" => Some(EventType::OrderSent),
            "PARTIAL_FILL" => Some(EventType::PartialFill),
            "FILLED" => Some(EventType::Filled),
            "OPENED" => Some(EventType::Opened),
            "TP_HIT" => Some(EventType::TpHit),
            "SL_HIT" => Some(EventType::SlHit),
            "MANUAL_CLOSE" => Some(EventType::ManualClose),
            "ERROR" => Some(EventType::Error),
            "CLOSED" => Some(EventType::Closed),
            _ => None,
        }
    }

    /// The event type that corresponds to each FSM edge (spec §4.3). `None`
    /// for event types not produced by a plain status transition (`TP_HIT`,
    /// `SL_HIT`, `ERROR` are emitted alongside a `CLOSED` transition by the
    /// SL/TP manager and closure service, carrying the specific trigger in
    /// metadata rather than as the transition's own event type).
    pub fn for_transition(from: TradeStatus, to: TradeStatus) -> Option<Self> {
        use TradeStatus::*;
        match (from, to) {
            (New, Validated) => Some(EventType::Validated),
            (Validated, OrderPlaced) => Some(EventType::OrderSent),
            (OrderPlaced, PartiallyFilled) => Some(EventType::PartialFill),
            (PartiallyFilled, PartiallyFilled) => Some(EventType::PartialFill),
            (OrderPlaced, Filled) | (PartiallyFilled, Filled) => Some(EventType::Filled),
            (Filled, Open) => Some(EventType::Opened),
            (Open, Closed) => Some(EventType::Closed),
            _ => None,
        }
    }
}

/// An append-only record of a trade's status change (spec §3). Event
/// timestamps for a given trade are non-decreasing (**I5**); every status
/// change has exactly one corresponding event with matching previous/new
/// status (**I3**); `CREATED` is always the first event for a trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub event_id: Uuid,
    pub trade_id: Uuid,
    pub event_type: EventType,
    pub previous_status: Option<TradeStatus>,
    pub new_status: TradeStatus,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}
