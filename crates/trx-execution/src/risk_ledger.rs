//! Optional realized-P&L callback (spec §9 resolved Open Question:
//! `RiskLedgerSink` — a risk-tracking subsystem may want to know about
//! realized P&L as trades close, but the Closure Service must work with or
//! without one wired in).

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

#[async_trait]
pub trait RiskLedgerSink: Send + Sync {
    async fn on_realized_pnl(&self, trade_id: Uuid, realized_pnl: Decimal);
}

/// Default sink: absence of a risk ledger is a no-op, not a missing feature.
pub struct NoopRiskLedgerSink;

#[async_trait]
impl RiskLedgerSink for NoopRiskLedgerSink {
    async fn on_realized_pnl(&self, _trade_id: Uuid, _realized_pnl: Decimal) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sink_accepts_any_call() {
        NoopRiskLedgerSink.on_realized_pnl(Uuid::new_v4(), Decimal::ZERO).await;
    }
}
