//! Position Manager (spec §4.5). A trade's `Position` row comes into being
//! at its first fill (partial or full) and is updated size-weighted on every
//! fill after that — the storage layer (`trx_db::positions`) already draws
//! that line between `insert_position` and `apply_partial_fill`.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use trx_schemas::{ExecutionTrade, Position};
use uuid::Uuid;

use crate::error::ExecutionError;

pub struct PositionManager {
    pool: PgPool,
}

impl PositionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// True if a trade's first fill has already opened a `Position` row.
    pub async fn has_position(&self, trade_id: Uuid) -> Result<bool, ExecutionError> {
        Ok(trx_db::positions::fetch_by_trade(&self.pool, trade_id).await?.is_some())
    }

    /// Records the first fill against a trade (spec §4.5: margin ≈
    /// size * price / leverage, **I2**).
    pub async fn open_position(
        &self,
        trade: &ExecutionTrade,
        fill_price: Decimal,
        fill_size: Decimal,
    ) -> Result<Position, ExecutionError> {
        let margin_used = fill_size * fill_price / trade.leverage;
        let position = Position {
            position_id: Uuid::new_v4(),
            trade_id: trade.trade_id,
            side: trade.side,
            size: fill_size,
            avg_entry_price: fill_price,
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            margin_used,
            leverage: trade.leverage,
            opened_at: Utc::now(),
            closed_at: None,
        };
        trx_db::positions::insert_position(&self.pool, &position).await?;
        Ok(position)
    }

    /// Folds a subsequent fill into the existing position (size-weighted
    /// average entry price, recomputed margin).
    pub async fn apply_fill(
        &self,
        trade: &ExecutionTrade,
        fill_price: Decimal,
        fill_size: Decimal,
    ) -> Result<(), ExecutionError> {
        let current = trx_db::positions::fetch_by_trade(&self.pool, trade.trade_id)
            .await?
            .ok_or_else(|| ExecutionError::DataIntegrity(format!("apply_fill: no position for trade {}", trade.trade_id)))?;
        let new_size = current.size + fill_size;
        let margin_used = new_size * ((current.avg_entry_price * current.size + fill_price * fill_size) / new_size) / trade.leverage;
        trx_db::positions::apply_partial_fill(&self.pool, trade.trade_id, fill_size, fill_price, margin_used).await?;
        Ok(())
    }

    pub async fn fetch(&self, trade_id: Uuid) -> Result<Option<Position>, ExecutionError> {
        Ok(trx_db::positions::fetch_by_trade(&self.pool, trade_id).await?)
    }

    pub async fn list_open(&self) -> Result<Vec<Position>, ExecutionError> {
        Ok(trx_db::positions::list_open(&self.pool).await?)
    }

    pub fn unrealized_pnl(position: &Position, current_price: Decimal) -> Decimal {
        position.unrealized_pnl(current_price)
    }
}
