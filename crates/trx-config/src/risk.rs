use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hard caps the risk engine enforces on every signal (spec §4.2, §6).
/// These are ceilings, never targets — a signal requesting less risk than
/// the cap is accepted at the requested value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimitsConfig {
    pub max_risk_per_trade: Decimal,
    pub max_leverage: Decimal,
    pub max_margin_usage: Decimal,
    pub min_position_size: Decimal,
}

impl Default for RiskLimitsConfig {
    fn default() -> Self {
        RiskLimitsConfig {
            max_risk_per_trade: Decimal::new(1, 2),   // 0.01
            max_leverage: Decimal::new(200, 0),        // 200
            max_margin_usage: Decimal::new(8, 1),      // 0.8
            min_position_size: Decimal::new(1, 2),     // 0.01
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_caps() {
        let c = RiskLimitsConfig::default();
        assert_eq!(c.max_risk_per_trade, Decimal::new(1, 2));
        assert_eq!(c.max_leverage, Decimal::new(200, 0));
        assert_eq!(c.max_margin_usage, Decimal::new(8, 1));
        assert_eq!(c.min_position_size, Decimal::new(1, 2));
    }
}
