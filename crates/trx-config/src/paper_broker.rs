use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// When a paper fill is applied relative to the triggering candle (spec §4.6).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillRule {
    /// Fill immediately at the requested price (adjusted for slippage/spread).
    Immediate,
    /// Fill at the open of the next candle after the signal's candle_ts.
    NextCandleOpen,
    /// Fill after `latency_ms` has elapsed, at the then-prevailing simulated price.
    RealisticDelay,
}

impl Default for FillRule {
    fn default() -> Self {
        FillRule::Immediate
    }
}

/// Paper broker simulation behavior (spec §6). Every field here is a named,
/// typed setting — no catch-all options map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperBrokerConfig {
    pub slippage_enabled: bool,
    pub max_slippage_bps: Decimal,
    pub spread_simulation: bool,
    pub spread_bps: Decimal,
    pub latency_ms: u64,
    pub partial_fills_enabled: bool,
    pub partial_fill_probability: Decimal,
    pub rejection_rate: Decimal,
    pub fill_rule: FillRule,
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        PaperBrokerConfig {
            slippage_enabled: true,
            max_slippage_bps: Decimal::new(5, 0),
            spread_simulation: true,
            spread_bps: Decimal::new(2, 0),
            latency_ms: 150,
            partial_fills_enabled: true,
            partial_fill_probability: Decimal::new(3, 1),
            rejection_rate: Decimal::new(0, 0),
            fill_rule: FillRule::Immediate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = PaperBrokerConfig::default();
        assert!(c.slippage_enabled);
        assert_eq!(c.fill_rule, FillRule::Immediate);
        assert_eq!(c.partial_fill_probability, Decimal::new(3, 1));
    }

    #[test]
    fn deserializes_from_partial_yaml() {
        let yaml = "fill_rule: NEXT_CANDLE_OPEN\nlatency_ms: 500\n";
        let parsed: PaperBrokerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.fill_rule, FillRule::NextCandleOpen);
        assert_eq!(parsed.latency_ms, 500);
        // unspecified fields fall back to defaults
        assert!(parsed.slippage_enabled);
    }
}
