use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Side;

/// A strategy-engine-produced directive to enter a trade (spec §3, immutable
/// input). The strategy decision engine itself (regime detection, setup
/// detection, confidence scoring) is an external collaborator — this is only
/// the contract the orchestrator consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: Uuid,
    pub strategy_decision_id: Uuid,
    pub direction: Side,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub rr_ratio: Decimal,
    /// Fraction of equity risked, in (0, 0.01].
    pub risk_fraction: Decimal,
    /// In [1, 200].
    pub leverage: Decimal,
    /// Tentative; the risk validator may return an adjusted size (§4.2).
    pub position_size: Decimal,
    pub margin_required: Decimal,
    pub candle_ts: DateTime<Utc>,
}

impl Signal {
    /// Stop distance, always positive for a well-formed signal.
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }

    /// R:R as actually implied by entry/SL/TP, independent of the stored
    /// `rr_ratio` field (used by invariant **I8**: stored R:R must match this
    /// within 5%).
    pub fn implied_rr(&self) -> Option<Decimal> {
        let stop = self.stop_distance();
        if stop.is_zero() {
            return None;
        }
        Some((self.take_profit - self.entry_price).abs() / stop)
    }

    /// Structural shape check: SL/TP strictly positive, SL/TP on the correct
    /// side of entry for the signal's direction, and stop distance > 0. This
    /// does NOT check risk/leverage/margin limits — that is `trx-risk`'s job.
    pub fn is_structurally_valid(&self) -> bool {
        if self.stop_loss <= Decimal::ZERO || self.take_profit <= Decimal::ZERO {
            return false;
        }
        if self.stop_loss == self.entry_price {
            return false;
        }
        match self.direction {
            Side::Buy => self.stop_loss < self.entry_price && self.take_profit > self.entry_price,
            Side::Sell => {
                self.stop_loss > self.entry_price && self.take_profit < self.entry_price
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy_signal() -> Signal {
        Signal {
            signal_id: Uuid::nil(),
            strategy_decision_id: Uuid::nil(),
            direction: Side::Buy,
            entry_price: dec!(2000.00),
            stop_loss: dec!(1990.00),
            take_profit: dec!(2020.00),
            rr_ratio: dec!(2.0),
            risk_fraction: dec!(0.005),
            leverage: dec!(100),
            position_size: dec!(0.10),
            margin_required: dec!(2.00),
            candle_ts: Utc::now(),
        }
    }

    #[test]
    fn implied_rr_matches_stored() {
        let s = buy_signal();
        assert_eq!(s.implied_rr(), Some(dec!(2.0)));
    }

    #[test]
    fn rejects_sl_at_entry() {
        let mut s = buy_signal();
        s.stop_loss = s.entry_price;
        assert!(!s.is_structurally_valid());
    }

    #[test]
    fn rejects_sl_on_wrong_side_for_buy() {
        let mut s = buy_signal();
        s.stop_loss = dec!(2010.00);
        assert!(!s.is_structurally_valid());
    }
}
