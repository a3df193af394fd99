use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use trx_schemas::{CloseReason, ExecutionMode, ExecutionTrade, Side, TradeStatus};
use uuid::Uuid;

/// Idempotent on `signal_id`: a second `process_signal` for the same signal
/// returns the already-created trade instead of inserting a duplicate
/// (spec §8, "duplicate submission ... produces the same trade id"). The
/// returned `bool` is `true` only for the caller that actually won the
/// insert — under concurrent calls for the same signal, every other caller
/// gets back the winner's trade with `false`, so it can short-circuit
/// instead of re-running trade setup (event append, order placement) a
/// second time.
pub async fn create_trade(pool: &PgPool, trade: &ExecutionTrade) -> Result<(ExecutionTrade, bool)> {
    let row = sqlx::query(
        r#"
        insert into execution_trades
            (trade_id, signal_id, instrument, timeframe, side, status, entry_price, stop_loss,
             take_profit, position_size, risk_percent, leverage, rr_ratio, execution_mode,
             created_at, updated_at)
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
        on conflict (signal_id) do nothing
        returning trade_id
        "#,
    )
    .bind(trade.trade_id)
    .bind(trade.signal_id)
    .bind(&trade.instrument)
    .bind(&trade.timeframe)
    .bind(trade.side.as_str())
    .bind(trade.status.as_str())
    .bind(trade.entry_price)
    .bind(trade.stop_loss)
    .bind(trade.take_profit)
    .bind(trade.position_size)
    .bind(trade.risk_percent)
    .bind(trade.leverage)
    .bind(trade.rr_ratio)
    .bind(trade.execution_mode.as_str())
    .bind(trade.created_at)
    .fetch_optional(pool)
    .await
    .context("create_trade insert failed")?;

    match row {
        Some(r) => {
            let trade_id: Uuid = r.try_get("trade_id")?;
            Ok((ExecutionTrade { trade_id, ..trade.clone() }, true))
        }
        None => {
            let existing = fetch_trade_by_signal(pool, trade.signal_id)
                .await?
                .context("create_trade: conflict row vanished")?;
            Ok((existing, false))
        }
    }
}

pub async fn fetch_trade(pool: &PgPool, trade_id: Uuid) -> Result<Option<ExecutionTrade>> {
    let row = sqlx::query(&format!("{SELECT_TRADE} where trade_id = $1"))
        .bind(trade_id)
        .fetch_optional(pool)
        .await
        .context("fetch_trade failed")?;
    row.map(row_to_trade).transpose()
}

pub async fn fetch_trade_by_signal(pool: &PgPool, signal_id: Uuid) -> Result<Option<ExecutionTrade>> {
    let row = sqlx::query(&format!("{SELECT_TRADE} where signal_id = $1"))
        .bind(signal_id)
        .fetch_optional(pool)
        .await
        .context("fetch_trade_by_signal failed")?;
    row.map(row_to_trade).transpose()
}

pub async fn list_open_trades(pool: &PgPool) -> Result<Vec<ExecutionTrade>> {
    let rows = sqlx::query(&format!("{SELECT_TRADE} where status = 'OPEN' order by opened_at asc"))
        .fetch_all(pool)
        .await
        .context("list_open_trades failed")?;
    rows.into_iter().map(row_to_trade).collect()
}

/// Transitions `status` and sets `updated_at`. Callers are expected to have
/// already validated the transition against the FSM (`trx-execution`); this
/// is a plain write, not a re-validation.
pub async fn update_status(pool: &PgPool, trade_id: Uuid, status: TradeStatus, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("update execution_trades set status = $2, updated_at = $3 where trade_id = $1")
        .bind(trade_id)
        .bind(status.as_str())
        .bind(now)
        .execute(pool)
        .await
        .context("update_status failed")?;
    Ok(())
}

pub async fn mark_opened(pool: &PgPool, trade_id: Uuid, opened_at: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        "update execution_trades set status = 'OPEN', opened_at = $2, updated_at = $2 where trade_id = $1",
    )
    .bind(trade_id)
    .bind(opened_at)
    .execute(pool)
    .await
    .context("mark_opened failed")?;
    Ok(())
}

pub async fn mark_closed(
    pool: &PgPool,
    trade_id: Uuid,
    reason: CloseReason,
    closed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        update execution_trades
        set status = 'CLOSED', close_reason = $2, closed_at = $3, updated_at = $3
        where trade_id = $1
        "#,
    )
    .bind(trade_id)
    .bind(reason.as_str())
    .bind(closed_at)
    .execute(pool)
    .await
    .context("mark_closed failed")?;
    Ok(())
}

pub async fn update_position_size(pool: &PgPool, trade_id: Uuid, size: Decimal) -> Result<()> {
    sqlx::query("update execution_trades set position_size = $2 where trade_id = $1")
        .bind(trade_id)
        .bind(size)
        .execute(pool)
        .await
        .context("update_position_size failed")?;
    Ok(())
}

const SELECT_TRADE: &str = r#"
    select trade_id, signal_id, instrument, timeframe, side, status, entry_price, stop_loss,
           take_profit, position_size, risk_percent, leverage, rr_ratio, execution_mode,
           opened_at, closed_at, close_reason, created_at, updated_at
    from execution_trades
"#;

fn row_to_trade(row: sqlx::postgres::PgRow) -> Result<ExecutionTrade> {
    let side: String = row.try_get("side")?;
    let status: String = row.try_get("status")?;
    let execution_mode: String = row.try_get("execution_mode")?;
    let close_reason: Option<String> = row.try_get("close_reason")?;

    Ok(ExecutionTrade {
        trade_id: row.try_get("trade_id")?,
        signal_id: row.try_get("signal_id")?,
        instrument: row.try_get("instrument")?,
        timeframe: row.try_get("timeframe")?,
        side: Side::parse(&side).context("bad side in execution_trades row")?,
        status: TradeStatus::parse(&status).context("bad status in execution_trades row")?,
        entry_price: row.try_get("entry_price")?,
        stop_loss: row.try_get("stop_loss")?,
        take_profit: row.try_get("take_profit")?,
        position_size: row.try_get("position_size")?,
        risk_percent: row.try_get("risk_percent")?,
        leverage: row.try_get("leverage")?,
        rr_ratio: row.try_get("rr_ratio")?,
        execution_mode: ExecutionMode::parse(&execution_mode)
            .context("bad execution_mode in execution_trades row")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
        close_reason: close_reason
            .map(|s| CloseReason::parse(&s).context("bad close_reason in execution_trades row"))
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
