use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Side;

/// The resulting exposure once an entry order has been filled (spec §3).
/// `trade_id` is unique: at most one *open* Position exists per trade (**I6**).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub trade_id: Uuid,
    pub side: Side,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub margin_used: Decimal,
    pub leverage: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// **I2**: `margin_used ≈ size * avg_entry_price / leverage`, tolerance ≤ 1%.
    pub fn margin_within_tolerance(&self) -> bool {
        if self.leverage.is_zero() {
            return false;
        }
        let expected = self.size * self.avg_entry_price / self.leverage;
        if expected.is_zero() {
            return self.margin_used.is_zero();
        }
        let drift = ((self.margin_used - expected) / expected).abs();
        drift <= Decimal::new(1, 2)
    }

    /// `(current − entry) × size × (+1 BUY / −1 SELL)` (spec §4.5).
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        (current_price - self.avg_entry_price) * self.size * Decimal::from(self.side.sign())
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pos() -> Position {
        Position {
            position_id: Uuid::nil(),
            trade_id: Uuid::nil(),
            side: Side::Buy,
            size: dec!(0.10),
            avg_entry_price: dec!(2000.00),
            stop_loss: dec!(1990.00),
            take_profit: dec!(2020.00),
            margin_used: dec!(2.00),
            leverage: dec!(100),
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn unrealized_pnl_buy() {
        let p = pos();
        assert_eq!(p.unrealized_pnl(dec!(2020.00)), dec!(2.00));
    }

    #[test]
    fn unrealized_pnl_sell_is_inverted() {
        let mut p = pos();
        p.side = Side::Sell;
        assert_eq!(p.unrealized_pnl(dec!(2020.00)), dec!(-2.00));
    }

    #[test]
    fn margin_tolerance_detects_drift() {
        let mut p = pos();
        p.margin_used = dec!(2.10); // 5% drift, outside 1% tolerance
        assert!(!p.margin_within_tolerance());
    }
}
