//! Position Closure Service (spec §4.7): the only place that writes a CLOSED
//! trade. The broker-side close (when there is one) happens before storage
//! is touched and is intentionally outside the commit boundary — the venue
//! is external to our transaction.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use trx_broker::BrokerAdapter;
use trx_schemas::{CloseReason, ExecutionTrade, Position};

use crate::error::ExecutionError;
use crate::risk_ledger::RiskLedgerSink;

fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct ClosureService {
    pool: PgPool,
    broker: Arc<dyn BrokerAdapter>,
    ledger: Arc<dyn RiskLedgerSink>,
}

impl ClosureService {
    pub fn new(pool: PgPool, broker: Arc<dyn BrokerAdapter>, ledger: Arc<dyn RiskLedgerSink>) -> Self {
        Self { pool, broker, ledger }
    }

    /// Closes a trade with a realized `Position` already open. `broker_position_id`
    /// is `None` when the venue already closed the position itself (a TP/SL
    /// bracket fill) — there's nothing left to call `close_position` on.
    pub async fn close(
        &self,
        trade: &ExecutionTrade,
        position: Option<&Position>,
        reason: CloseReason,
        close_price: Decimal,
        broker_position_id: Option<&str>,
    ) -> Result<Decimal, ExecutionError> {
        if let Some(id) = broker_position_id {
            self.broker.close_position(id).await?;
        }

        let realized_pnl = match position {
            Some(p) => round2((close_price - p.avg_entry_price) * p.size * Decimal::from(trade.side.sign())),
            None => Decimal::ZERO,
        };

        let write = trx_db::closure::ClosureWrite {
            trade_id: trade.trade_id,
            previous_status: trade.status,
            reason,
            closed_at: chrono::Utc::now(),
            realized_pnl,
        };

        // The broker close above is already durable at this point. If the
        // commit below fails, we cannot retry the broker call — we surface a
        // reconciliation error instead of silently losing the closure.
        trx_db::closure::commit_closure(&self.pool, &write)
            .await
            .map_err(|e| ExecutionError::ReconciliationRequired(format!("trade {}: {e}", trade.trade_id)))?;

        self.ledger.on_realized_pnl(trade.trade_id, realized_pnl).await;
        Ok(realized_pnl)
    }

    /// Convenience for cancellation paths that have no `Position` yet
    /// (spec §4.3: cancellable states precede the first fill).
    pub async fn close_without_position(
        &self,
        trade: &ExecutionTrade,
        reason: CloseReason,
    ) -> Result<Decimal, ExecutionError> {
        self.close(trade, None, reason, trade.entry_price, None).await
    }
}
