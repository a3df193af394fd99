use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Side;

/// Trade lifecycle status (spec §4.3). Closed sum type; the FSM in
/// `trx-execution` is the only code allowed to transition between variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    New,
    Validated,
    OrderPlaced,
    PartiallyFilled,
    Filled,
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::New => "NEW",
            TradeStatus::Validated => "VALIDATED",
            TradeStatus::OrderPlaced => "ORDER_PLACED",
            TradeStatus::PartiallyFilled => "PARTIALLY_FILLED",
            TradeStatus::Filled => "FILLED",
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(TradeStatus::New),
            "VALIDATED" => Some(TradeStatus::Validated),
            "ORDER_PLACED" => Some(TradeStatus::OrderPlaced),
            "PARTIALLY_FILLED" => Some(TradeStatus::PartiallyFilled),
            "FILLED" => Some(TradeStatus::Filled),
            "OPEN" => Some(TradeStatus::Open),
            "CLOSED" => Some(TradeStatus::Closed),
            _ => None,
        }
    }

    /// §4.3: cancellable iff NEW, VALIDATED, ORDER_PLACED, or PARTIALLY_FILLED.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            TradeStatus::New
                | TradeStatus::Validated
                | TradeStatus::OrderPlaced
                | TradeStatus::PartiallyFilled
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Closed)
    }
}

/// Why a trade was closed (spec §3, §4.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloseReason {
    Tp,
    Sl,
    Manual,
    Error,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Tp => "TP",
            CloseReason::Sl => "SL",
            CloseReason::Manual => "MANUAL",
            CloseReason::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TP" => Some(CloseReason::Tp),
            "SL" => Some(CloseReason::Sl),
            "MANUAL" => Some(CloseReason::Manual),
            "ERROR" => Some(CloseReason::Error),
            _ => None,
        }
    }
}

/// Which broker back-end is executing this trade. `Mt5`/`Rest` are reserved
/// slots (spec §1 Non-goals: "no live broker integrations beyond the adapter
/// contract"); only `Paper` has a concrete adapter in this engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    Paper,
    Mt5,
    Rest,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Paper => "PAPER",
            ExecutionMode::Mt5 => "MT5",
            ExecutionMode::Rest => "REST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAPER" => Some(ExecutionMode::Paper),
            "MT5" => Some(ExecutionMode::Mt5),
            "REST" => Some(ExecutionMode::Rest),
            _ => None,
        }
    }
}

/// The orchestrator's record of a signal's journey through the lifecycle
/// (spec §3). Owns its Orders, Executions, Position, and Events (§3
/// Ownership): all are created under `trade_id` and deleted only when the
/// trade is purged (enforced at the schema level via `ON DELETE CASCADE`,
/// see `trx-db` migrations — resolves the "orphan rows" Open Question).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrade {
    pub trade_id: Uuid,
    pub signal_id: Uuid,
    pub instrument: String,
    pub timeframe: String,
    pub side: Side,
    pub status: TradeStatus,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub position_size: Decimal,
    pub risk_percent: Decimal,
    pub leverage: Decimal,
    pub rr_ratio: Decimal,
    pub execution_mode: ExecutionMode,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<CloseReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionTrade {
    /// **I1**: risk_percent ≤ 1% and leverage ≤ 200:1.
    /// **I2** is a Position-level invariant, checked in `trx-execution`.
    pub fn respects_risk_caps(&self) -> bool {
        self.risk_percent <= Decimal::new(1, 2) && self.leverage <= Decimal::from(200)
    }

    /// close_reason is set iff status == Closed.
    pub fn close_reason_consistent(&self) -> bool {
        match self.status {
            TradeStatus::Closed => self.close_reason.is_some(),
            _ => self.close_reason.is_none(),
        }
    }
}
