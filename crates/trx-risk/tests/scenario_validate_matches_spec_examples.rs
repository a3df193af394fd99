//! Exercises the three worked examples from the spec's testable-properties
//! section: happy-path approval, a risk-exceeded rejection with an adjusted
//! size offered, and a leverage-cap rejection with no adjustment offered.

use chrono::Utc;
use rust_decimal_macros::dec;
use trx_risk::{validate, RiskDecision, RiskLimitsConfig, ViolationKind};
use trx_schemas::{Side, Signal};
use uuid::Uuid;

fn limits() -> RiskLimitsConfig {
    RiskLimitsConfig {
        max_risk_per_trade: dec!(0.01),
        max_leverage: dec!(200),
        max_margin_usage: dec!(0.8),
        min_position_size: dec!(0.01),
    }
}

fn xauusd_buy(risk_fraction: rust_decimal::Decimal, leverage: rust_decimal::Decimal) -> Signal {
    Signal {
        signal_id: Uuid::new_v4(),
        strategy_decision_id: Uuid::new_v4(),
        direction: Side::Buy,
        entry_price: dec!(2000.00),
        stop_loss: dec!(1990.00),
        take_profit: dec!(2020.00),
        rr_ratio: dec!(2.0),
        risk_fraction,
        leverage,
        position_size: dec!(0.10),
        margin_required: dec!(2.00),
        candle_ts: Utc::now(),
    }
}

#[test]
fn happy_path_buy_xauusd_is_approved_with_expected_margin() {
    let sig = xauusd_buy(dec!(0.005), dec!(100));
    let decision = validate(&sig, dec!(10_000), &limits());
    assert_eq!(
        decision,
        RiskDecision::Approved {
            position_size: dec!(0.10),
            margin_required: dec!(2.00),
        }
    );
}

#[test]
fn risk_of_five_percent_is_rejected_with_adjusted_size_offered() {
    let sig = xauusd_buy(dec!(0.05), dec!(100));
    let decision = validate(&sig, dec!(10_000), &limits());
    match decision {
        RiskDecision::Rejected { violations, adjusted_position_size } => {
            assert_eq!(violations, vec![ViolationKind::RiskExceeded]);
            assert!(adjusted_position_size.is_some(), "an adjusted size must be offered");
        }
        RiskDecision::Approved { .. } => panic!("risk 0.05 must be rejected"),
    }
}

#[test]
fn leverage_of_three_hundred_is_rejected_with_no_adjustment() {
    let sig = xauusd_buy(dec!(0.005), dec!(300));
    let decision = validate(&sig, dec!(10_000), &limits());
    match decision {
        RiskDecision::Rejected { violations, adjusted_position_size } => {
            assert_eq!(violations, vec![ViolationKind::LeverageExceeded]);
            assert!(adjusted_position_size.is_none(), "leverage breach offers no adjustment");
        }
        RiskDecision::Approved { .. } => panic!("leverage 300 must be rejected"),
    }
}
