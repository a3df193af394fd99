use rust_decimal::Decimal;

/// Risk caps a signal is validated against (spec defaults in `trx-config::risk`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskLimitsConfig {
    pub max_risk_per_trade: Decimal,
    pub max_leverage: Decimal,
    pub max_margin_usage: Decimal,
    pub min_position_size: Decimal,
}

/// One failed check from `validate`. Order matches the spec's check order:
/// risk, then leverage, then margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    RiskExceeded,
    LeverageExceeded,
    InsufficientMargin,
    /// Stop distance is zero or SL/TP sit on the wrong side of entry.
    InvalidStopDistance,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::RiskExceeded => "RISK_EXCEEDED",
            ViolationKind::LeverageExceeded => "LEVERAGE_EXCEEDED",
            ViolationKind::InsufficientMargin => "INSUFFICIENT_MARGIN",
            ViolationKind::InvalidStopDistance => "INVALID_STOP_DISTANCE",
        }
    }
}

/// Outcome of `validate`. On rejection an adjusted size is offered only when
/// `RiskExceeded` is the sole violation — a leverage or margin breach can't
/// be fixed by resizing alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RiskDecision {
    Approved {
        position_size: Decimal,
        margin_required: Decimal,
    },
    Rejected {
        violations: Vec<ViolationKind>,
        adjusted_position_size: Option<Decimal>,
    },
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved { .. })
    }
}
