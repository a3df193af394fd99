use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use trx_schemas::{Signal, Side};
use uuid::Uuid;

/// Ensures a `strategy_decisions` parent row exists, then inserts the signal.
/// Both are no-ops on conflict so replaying a strategy feed is safe.
pub async fn insert_signal(pool: &PgPool, signal: &Signal) -> Result<()> {
    sqlx::query("insert into strategy_decisions (strategy_decision_id) values ($1) on conflict do nothing")
        .bind(signal.strategy_decision_id)
        .execute(pool)
        .await
        .context("insert_signal: strategy_decisions upsert failed")?;

    sqlx::query(
        r#"
        insert into trade_signals
            (signal_id, strategy_decision_id, direction, entry_price, stop_loss, take_profit,
             rr_ratio, risk_fraction, leverage, position_size, margin_required, candle_ts)
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        on conflict (signal_id) do nothing
        "#,
    )
    .bind(signal.signal_id)
    .bind(signal.strategy_decision_id)
    .bind(signal.direction.as_str())
    .bind(signal.entry_price)
    .bind(signal.stop_loss)
    .bind(signal.take_profit)
    .bind(signal.rr_ratio)
    .bind(signal.risk_fraction)
    .bind(signal.leverage)
    .bind(signal.position_size)
    .bind(signal.margin_required)
    .bind(signal.candle_ts)
    .execute(pool)
    .await
    .context("insert_signal failed")?;

    Ok(())
}

pub async fn fetch_signal(pool: &PgPool, signal_id: Uuid) -> Result<Option<Signal>> {
    let row = sqlx::query(
        r#"
        select signal_id, strategy_decision_id, direction, entry_price, stop_loss, take_profit,
               rr_ratio, risk_fraction, leverage, position_size, margin_required, candle_ts
        from trade_signals
        where signal_id = $1
        "#,
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await
    .context("fetch_signal failed")?;

    let Some(row) = row else { return Ok(None) };

    let direction: String = row.try_get("direction")?;
    let candle_ts: DateTime<Utc> = row.try_get("candle_ts")?;

    Ok(Some(Signal {
        signal_id: row.try_get("signal_id")?,
        strategy_decision_id: row.try_get("strategy_decision_id")?,
        direction: Side::parse(&direction).context("bad direction in trade_signals row")?,
        entry_price: row.try_get("entry_price")?,
        stop_loss: row.try_get("stop_loss")?,
        take_profit: row.try_get("take_profit")?,
        rr_ratio: row.try_get("rr_ratio")?,
        risk_fraction: row.try_get("risk_fraction")?,
        leverage: row.try_get("leverage")?,
        position_size: row.try_get("position_size")?,
        margin_required: row.try_get("margin_required")?,
        candle_ts,
    }))
}
