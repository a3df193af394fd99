use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use trx_schemas::{Position, Side};
use uuid::Uuid;

/// Unique on `trade_id` — at most one Position per trade (I6).
pub async fn insert_position(pool: &PgPool, position: &Position) -> Result<()> {
    sqlx::query(
        r#"
        insert into positions
            (position_id, trade_id, side, size, avg_entry_price, stop_loss, take_profit,
             margin_used, leverage, opened_at, closed_at)
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(position.position_id)
    .bind(position.trade_id)
    .bind(position.side.as_str())
    .bind(position.size)
    .bind(position.avg_entry_price)
    .bind(position.stop_loss)
    .bind(position.take_profit)
    .bind(position.margin_used)
    .bind(position.leverage)
    .bind(position.opened_at)
    .bind(position.closed_at)
    .execute(pool)
    .await
    .context("insert_position failed")?;
    Ok(())
}

pub async fn fetch_by_trade(pool: &PgPool, trade_id: Uuid) -> Result<Option<Position>> {
    let row = sqlx::query(&format!("{SELECT_POSITION} where trade_id = $1"))
        .bind(trade_id)
        .fetch_optional(pool)
        .await
        .context("fetch_by_trade failed")?;
    row.map(row_to_position).transpose()
}

pub async fn list_open(pool: &PgPool) -> Result<Vec<Position>> {
    let rows = sqlx::query(&format!("{SELECT_POSITION} where closed_at is null order by opened_at asc"))
        .fetch_all(pool)
        .await
        .context("list_open failed")?;
    rows.into_iter().map(row_to_position).collect()
}

/// Size-weighted average-entry update on a partial fill (spec §4.5,
/// resolved Open Question: partials update the same Position aggregate).
pub async fn apply_partial_fill(
    pool: &PgPool,
    trade_id: Uuid,
    additional_size: Decimal,
    additional_price: Decimal,
    margin_used: Decimal,
) -> Result<()> {
    let row = sqlx::query(
        r#"
        update positions
        set size = size + $2,
            avg_entry_price = (avg_entry_price * size + $3 * $2) / (size + $2),
            margin_used = $4
        where trade_id = $1
        returning position_id
        "#,
    )
    .bind(trade_id)
    .bind(additional_size)
    .bind(additional_price)
    .bind(margin_used)
    .fetch_optional(pool)
    .await
    .context("apply_partial_fill failed")?;
    row.context("apply_partial_fill: no open position for trade")
        .map(|_| ())
}

pub async fn close_position(pool: &PgPool, trade_id: Uuid, closed_at: DateTime<Utc>) -> Result<()> {
    sqlx::query("update positions set closed_at = $2 where trade_id = $1")
        .bind(trade_id)
        .bind(closed_at)
        .execute(pool)
        .await
        .context("close_position failed")?;
    Ok(())
}

const SELECT_POSITION: &str = r#"
    select position_id, trade_id, side, size, avg_entry_price, stop_loss, take_profit,
           margin_used, leverage, opened_at, closed_at
    from positions
"#;

fn row_to_position(row: sqlx::postgres::PgRow) -> Result<Position> {
    let side: String = row.try_get("side")?;
    Ok(Position {
        position_id: row.try_get("position_id")?,
        trade_id: row.try_get("trade_id")?,
        side: Side::parse(&side).context("bad side in positions row")?,
        size: row.try_get("size")?,
        avg_entry_price: row.try_get("avg_entry_price")?,
        stop_loss: row.try_get("stop_loss")?,
        take_profit: row.try_get("take_profit")?,
        margin_used: row.try_get("margin_used")?,
        leverage: row.try_get("leverage")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
    })
}
