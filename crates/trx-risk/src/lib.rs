//! trx-risk
//!
//! Risk validator and position sizer (spec §4.2).
//!
//! Deterministic, pure logic: no IO, no time, no broker calls. Given the same
//! signal, balance and limits, `validate` always returns the same decision.

mod engine;
mod types;

pub use engine::{margin_required, position_size_for_risk, round_size_down, validate};
pub use types::{RiskDecision, RiskLimitsConfig, ViolationKind};
