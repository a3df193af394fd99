//! Order Manager (spec §4.4): places entry and bracket orders, ingests
//! `ExecutionReport`s idempotently, and keeps `execution_orders` in sync.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use trx_broker::{BrokerAdapter, ExecutionReport, OrderRequest};
use trx_schemas::{ExecutionOrder, ExecutionTrade, OrderStatus, OrderType, Side};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::idmap::{OrderIndex, OrderIndexEntry, OrderRole};

/// Deterministic namespace for turning an opaque venue `execution_id` string
/// into a `Uuid` for the `executions.execution_id` primary key — no RNG, so
/// the same report always maps to the same row (mirrors `trx-audit`'s
/// hash-derived event ids).
const EXECUTION_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x45, 0x1c, 0x9d, 0x9b, 0x4e, 0x4f, 0x0e, 0xae, 0x3d, 0x8f, 0x5b, 0x4a, 0x6c, 0x21, 0x07,
]);

fn execution_uuid(raw: &str) -> Uuid {
    Uuid::new_v5(&EXECUTION_ID_NAMESPACE, raw.as_bytes())
}

/// Result of ingesting one `ExecutionReport` against a known order.
pub struct FillOutcome {
    pub trade_id: Uuid,
    pub order_id: Uuid,
    pub role: OrderRole,
    pub fully_filled: bool,
    pub filled_price: Decimal,
    pub filled_size: Decimal,
}

pub struct OrderManager {
    pool: PgPool,
    broker: Arc<dyn BrokerAdapter>,
    index: OrderIndex,
}

impl OrderManager {
    pub fn new(pool: PgPool, broker: Arc<dyn BrokerAdapter>) -> Self {
        Self { pool, broker, index: OrderIndex::new() }
    }

    /// Places the entry order for a freshly validated trade (spec §4.4).
    pub async fn place_order_for(&self, trade: &ExecutionTrade) -> Result<ExecutionOrder, ExecutionError> {
        self.place_leg(
            trade.trade_id,
            trade.instrument.clone(),
            trade.side,
            OrderType::Market,
            None,
            trade.position_size,
            OrderRole::Entry,
        )
        .await
    }

    /// Places one bracket leg (spec §4.6): a LIMIT order on the opposite
    /// side, sized to the full position, at `price`.
    pub async fn place_bracket_leg(
        &self,
        trade: &ExecutionTrade,
        role: OrderRole,
        size: Decimal,
        price: Decimal,
    ) -> Result<ExecutionOrder, ExecutionError> {
        debug_assert!(matches!(role, OrderRole::StopLoss | OrderRole::TakeProfit));
        self.place_leg(trade.trade_id, trade.instrument.clone(), trade.side.opposite(), OrderType::Limit, Some(price), size, role)
            .await
    }

    async fn place_leg(
        &self,
        trade_id: Uuid,
        symbol: String,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        size: Decimal,
        role: OrderRole,
    ) -> Result<ExecutionOrder, ExecutionError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let request = OrderRequest { symbol, side, size, order_type, price, stop_loss: None, take_profit: None };

        let response = self.broker.place_order(request).await?;

        let order = ExecutionOrder {
            order_id,
            trade_id,
            broker_order_id: Some(response.broker_order_id.clone()),
            side,
            order_type,
            requested_price: price,
            requested_size: size,
            status: response.status,
            created_at: now,
            updated_at: now,
        };
        trx_db::orders::insert_order(&self.pool, &order).await?;

        self.index.register(
            response.broker_order_id.clone(),
            OrderIndexEntry { order_id, trade_id, requested_size: size, role },
        );

        // Fills are never processed from `response` here, even when the adapter
        // reports one inline (spec §4.1 `OrderResponse` doc) — `BrokerAdapter`
        // impls are required to also deliver every fill through
        // `subscribe_executions`, and that is the single path into
        // `handle_execution` so a fill is routed through the reducer
        // (`on_entry_fill`/`on_bracket_fill`) exactly once.
        Ok(order)
    }

    /// Ingests one execution report (spec §4.4, §8: idempotent, dropped if
    /// the `broker_order_id` is unknown).
    pub async fn handle_execution(&self, report: ExecutionReport) -> Result<Option<FillOutcome>, ExecutionError> {
        let Some(entry) = self.index.lookup(&report.broker_order_id) else {
            warn!(broker_order_id = %report.broker_order_id, "execution report for unknown order, dropping");
            return Ok(None);
        };

        let execution = trx_schemas::Execution {
            execution_id: execution_uuid(&report.execution_id),
            order_id: entry.order_id,
            trade_id: entry.trade_id,
            filled_price: report.filled_price,
            filled_size: report.filled_size,
            slippage: report.slippage,
            executed_at: report.timestamp,
        };
        let inserted = trx_db::executions::insert_execution(&self.pool, &execution).await?;
        if !inserted {
            return Ok(None);
        }

        let cumulative = trx_db::executions::cumulative_filled(&self.pool, entry.order_id).await?;
        let fully_filled = cumulative >= entry.requested_size;
        let new_status = if fully_filled { OrderStatus::Filled } else { OrderStatus::PartiallyFilled };
        trx_db::orders::update_status(&self.pool, entry.order_id, new_status, Utc::now()).await?;

        if fully_filled {
            self.index.deregister(&report.broker_order_id);
        }

        Ok(Some(FillOutcome {
            trade_id: entry.trade_id,
            order_id: entry.order_id,
            role: entry.role,
            fully_filled,
            filled_price: report.filled_price,
            filled_size: report.filled_size,
        }))
    }

    /// Read-only lookup used by the orchestrator to route an asynchronously
    /// delivered `ExecutionReport` to the right trade's reducer queue,
    /// without consuming the index entry the way `handle_execution` does.
    pub fn peek_trade_id(&self, broker_order_id: &str) -> Option<Uuid> {
        self.index.lookup(broker_order_id).map(|e| e.trade_id)
    }

    /// Cancels an order if it hasn't already reached a terminal status
    /// (spec §4.4). A no-op on an already-terminal order.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), ExecutionError> {
        let Some(order) = trx_db::orders::fetch_order(&self.pool, order_id).await? else {
            return Err(ExecutionError::DataIntegrity(format!("cancel_order: unknown order {order_id}")));
        };
        if !order.can_transition() {
            return Ok(());
        }
        if let Some(broker_order_id) = &order.broker_order_id {
            self.broker.cancel_order(broker_order_id).await?;
            self.index.deregister(broker_order_id);
        }
        trx_db::orders::update_status(&self.pool, order_id, OrderStatus::Cancelled, Utc::now()).await?;
        Ok(())
    }
}
