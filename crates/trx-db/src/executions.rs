use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use trx_schemas::Execution;
use uuid::Uuid;

/// Idempotent on `execution_id` (spec §8: "re-dispatching an identical
/// `ExecutionReport` ... does not double-fill"). Returns `false` if this
/// execution was already recorded.
pub async fn insert_execution(pool: &PgPool, exec: &Execution) -> Result<bool> {
    let row = sqlx::query(
        r#"
        insert into executions (execution_id, order_id, trade_id, filled_price, filled_size, slippage, executed_at)
        values ($1, $2, $3, $4, $5, $6, $7)
        on conflict (execution_id) do nothing
        returning execution_id
        "#,
    )
    .bind(exec.execution_id)
    .bind(exec.order_id)
    .bind(exec.trade_id)
    .bind(exec.filled_price)
    .bind(exec.filled_size)
    .bind(exec.slippage)
    .bind(exec.executed_at)
    .fetch_optional(pool)
    .await
    .context("insert_execution failed")?;
    Ok(row.is_some())
}

pub async fn list_for_order(pool: &PgPool, order_id: Uuid) -> Result<Vec<Execution>> {
    let rows = sqlx::query(
        r#"
        select execution_id, order_id, trade_id, filled_price, filled_size, slippage, executed_at
        from executions
        where order_id = $1
        order by executed_at asc
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("list_for_order failed")?;
    rows.into_iter().map(row_to_execution).collect()
}

/// Sum of `filled_size` for an order, used by the Order Manager to decide
/// `PARTIALLY_FILLED` vs `FILLED` (spec §4.4).
pub async fn cumulative_filled(pool: &PgPool, order_id: Uuid) -> Result<Decimal> {
    let row = sqlx::query("select coalesce(sum(filled_size), 0) as total from executions where order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .context("cumulative_filled failed")?;
    row.try_get("total").context("cumulative_filled: missing total column")
}

fn row_to_execution(row: sqlx::postgres::PgRow) -> Result<Execution> {
    Ok(Execution {
        execution_id: row.try_get("execution_id")?,
        order_id: row.try_get("order_id")?,
        trade_id: row.try_get("trade_id")?,
        filled_price: row.try_get("filled_price")?,
        filled_size: row.try_get("filled_size")?,
        slippage: row.try_get("slippage")?,
        executed_at: row.try_get("executed_at")?,
    })
}
