use rust_decimal::{Decimal, RoundingStrategy};
use trx_schemas::Signal;

use crate::{RiskDecision, RiskLimitsConfig, ViolationKind};

/// Margin required to hold `size` units at `entry` with `leverage`.
pub fn margin_required(size: Decimal, entry: Decimal, leverage: Decimal) -> Decimal {
    size * entry / leverage
}

/// Rounds a position size down to 2 decimals, clamped to the configured floor.
pub fn round_size_down(size: Decimal, min_position_size: Decimal) -> Decimal {
    let rounded = size.round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if rounded < min_position_size {
        min_position_size
    } else {
        rounded
    }
}

/// Position size implied by a risk budget and stop distance:
/// `size = risk_amount / stop_distance`, rounded down to 2dp, floored at
/// `min_position_size`.
pub fn position_size_for_risk(
    balance: Decimal,
    risk_fraction: Decimal,
    stop_distance: Decimal,
    limits: &RiskLimitsConfig,
) -> Decimal {
    let risk_amount = balance * risk_fraction;
    let size = risk_amount / stop_distance;
    round_size_down(size, limits.min_position_size)
}

/// `min( (balance * max_risk_per_trade) / stop_distance, (balance * max_margin_usage * leverage) / entry )`,
/// rounded down to 2dp and floored at `min_position_size`.
fn adjusted_size(signal: &Signal, balance: Decimal, limits: &RiskLimitsConfig) -> Decimal {
    let stop_distance = signal.stop_distance();
    let risk_capped = (balance * limits.max_risk_per_trade) / stop_distance;
    let margin_capped = (balance * limits.max_margin_usage * signal.leverage) / signal.entry_price;
    round_size_down(risk_capped.min(margin_capped), limits.min_position_size)
}

/// Validates a signal against the risk, leverage and margin caps. Pure and
/// deterministic: identical inputs always produce identical outputs.
pub fn validate(signal: &Signal, balance: Decimal, limits: &RiskLimitsConfig) -> RiskDecision {
    if !signal.is_structurally_valid() {
        return RiskDecision::Rejected {
            violations: vec![ViolationKind::InvalidStopDistance],
            adjusted_position_size: None,
        };
    }

    let margin = margin_required(signal.position_size, signal.entry_price, signal.leverage);

    let mut violations = Vec::new();
    if signal.risk_fraction > limits.max_risk_per_trade {
        violations.push(ViolationKind::RiskExceeded);
    }
    if signal.leverage > limits.max_leverage {
        violations.push(ViolationKind::LeverageExceeded);
    }
    if margin > limits.max_margin_usage * balance {
        violations.push(ViolationKind::InsufficientMargin);
    }

    if violations.is_empty() {
        return RiskDecision::Approved {
            position_size: signal.position_size,
            margin_required: margin,
        };
    }

    let adjusted_position_size = if violations == [ViolationKind::RiskExceeded] {
        Some(adjusted_size(signal, balance, limits))
    } else {
        None
    };

    RiskDecision::Rejected {
        violations,
        adjusted_position_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use trx_schemas::Side;
    use uuid::Uuid;

    fn limits() -> RiskLimitsConfig {
        RiskLimitsConfig {
            max_risk_per_trade: dec!(0.01),
            max_leverage: dec!(200),
            max_margin_usage: dec!(0.8),
            min_position_size: dec!(0.01),
        }
    }

    fn signal(risk_fraction: Decimal, leverage: Decimal, position_size: Decimal) -> Signal {
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
            position_size,
            margin_required: dec!(2.00),
            candle_ts: Utc::now(),
        }
    }

    #[test]
    fn happy_path_is_approved() {
        let sig = signal(dec!(0.005), dec!(100), dec!(0.10));
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
    fn risk_exactly_at_cap_is_accepted() {
        let sig = signal(dec!(0.01), dec!(100), dec!(0.10));
        assert!(validate(&sig, dec!(10_000), &limits()).is_approved());
    }

    #[test]
    fn risk_fraction_just_over_cap_is_rejected() {
        let sig = signal(dec!(0.0100001), dec!(100), dec!(0.10));
        let decision = validate(&sig, dec!(10_000), &limits());
        match decision {
            RiskDecision::Rejected { violations, adjusted_position_size } => {
                assert_eq!(violations, vec![ViolationKind::RiskExceeded]);
                assert!(adjusted_position_size.is_some());
            }
            RiskDecision::Approved { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn risk_exceeded_offers_adjusted_size() {
        let sig = signal(dec!(0.05), dec!(100), dec!(0.10));
        let decision = validate(&sig, dec!(10_000), &limits());
        match decision {
            RiskDecision::Rejected { violations, adjusted_position_size } => {
                assert_eq!(violations, vec![ViolationKind::RiskExceeded]);
                // (10_000 * 0.01) / 10.00 = 10.0, (10_000 * 0.8 * 100) / 2000 = 400 -> min is 10.0
                assert_eq!(adjusted_position_size, Some(dec!(10.00)));
            }
            RiskDecision::Approved { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn leverage_cap_breach_offers_no_adjustment() {
        let sig = signal(dec!(0.005), dec!(300), dec!(0.10));
        let decision = validate(&sig, dec!(10_000), &limits());
        match decision {
            RiskDecision::Rejected { violations, adjusted_position_size } => {
                assert_eq!(violations, vec![ViolationKind::LeverageExceeded]);
                assert!(adjusted_position_size.is_none());
            }
            RiskDecision::Approved { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn insufficient_margin_is_rejected() {
        // size 5 @ entry 2000, leverage 1 -> margin 10_000, way above 0.8 * 1000 balance.
        let sig = signal(dec!(0.005), dec!(1), dec!(5));
        let decision = validate(&sig, dec!(1_000), &limits());
        match decision {
            RiskDecision::Rejected { violations, adjusted_position_size } => {
                assert_eq!(violations, vec![ViolationKind::InsufficientMargin]);
                assert!(adjusted_position_size.is_none());
            }
            RiskDecision::Approved { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn stop_loss_at_entry_is_rejected_before_risk_checks() {
        let mut sig = signal(dec!(0.005), dec!(100), dec!(0.10));
        sig.stop_loss = sig.entry_price;
        let decision = validate(&sig, dec!(10_000), &limits());
        match decision {
            RiskDecision::Rejected { violations, adjusted_position_size } => {
                assert_eq!(violations, vec![ViolationKind::InvalidStopDistance]);
                assert!(adjusted_position_size.is_none());
            }
            RiskDecision::Approved { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn position_sizer_rounds_down_and_floors() {
        let limits = limits();
        // risk_amount = 10_000 * 0.005 = 50; stop_distance = 10 -> size = 5.0 exactly
        let size = position_size_for_risk(dec!(10_000), dec!(0.005), dec!(10), &limits);
        assert_eq!(size, dec!(5.00));

        // a tiny risk budget should floor at min_position_size rather than round to 0
        let tiny = position_size_for_risk(dec!(100), dec!(0.0001), dec!(500), &limits);
        assert_eq!(tiny, dec!(0.01));
    }
}
