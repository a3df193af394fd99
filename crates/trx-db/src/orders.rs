use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use trx_schemas::{ExecutionOrder, OrderStatus, OrderType, Side};
use uuid::Uuid;

pub async fn insert_order(pool: &PgPool, order: &ExecutionOrder) -> Result<()> {
    sqlx::query(
        r#"
        insert into execution_orders
            (order_id, trade_id, broker_order_id, side, order_type, requested_price,
             requested_size, status, created_at, updated_at)
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        "#,
    )
    .bind(order.order_id)
    .bind(order.trade_id)
    .bind(&order.broker_order_id)
    .bind(order.side.as_str())
    .bind(order.order_type.as_str())
    .bind(order.requested_price)
    .bind(order.requested_size)
    .bind(order.status.as_str())
    .bind(order.created_at)
    .execute(pool)
    .await
    .context("insert_order failed")?;
    Ok(())
}

pub async fn fetch_order(pool: &PgPool, order_id: Uuid) -> Result<Option<ExecutionOrder>> {
    let row = sqlx::query(&format!("{SELECT_ORDER} where order_id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?;
    row.map(row_to_order).transpose()
}

pub async fn list_orders_for_trade(pool: &PgPool, trade_id: Uuid) -> Result<Vec<ExecutionOrder>> {
    let rows = sqlx::query(&format!("{SELECT_ORDER} where trade_id = $1 order by created_at asc"))
        .bind(trade_id)
        .fetch_all(pool)
        .await
        .context("list_orders_for_trade failed")?;
    rows.into_iter().map(row_to_order).collect()
}

pub async fn set_broker_order_id(pool: &PgPool, order_id: Uuid, broker_order_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("update execution_orders set broker_order_id = $2, updated_at = $3 where order_id = $1")
        .bind(order_id)
        .bind(broker_order_id)
        .bind(now)
        .execute(pool)
        .await
        .context("set_broker_order_id failed")?;
    Ok(())
}

/// Only writes the new status if the current status is non-terminal —
/// mirrors `ExecutionOrder::can_transition` at the storage boundary so a
/// stray update can never resurrect a terminal order.
pub async fn update_status(pool: &PgPool, order_id: Uuid, status: OrderStatus, now: DateTime<Utc>) -> Result<bool> {
    let row = sqlx::query(
        r#"
        update execution_orders
        set status = $2, updated_at = $3
        where order_id = $1
          and status not in ('FILLED', 'REJECTED', 'CANCELLED')
        returning order_id
        "#,
    )
    .bind(order_id)
    .bind(status.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await
    .context("update_status failed")?;
    Ok(row.is_some())
}

const SELECT_ORDER: &str = r#"
    select order_id, trade_id, broker_order_id, side, order_type, requested_price,
           requested_size, status, created_at, updated_at
    from execution_orders
"#;

fn row_to_order(row: sqlx::postgres::PgRow) -> Result<ExecutionOrder> {
    let side: String = row.try_get("side")?;
    let order_type: String = row.try_get("order_type")?;
    let status: String = row.try_get("status")?;

    Ok(ExecutionOrder {
        order_id: row.try_get("order_id")?,
        trade_id: row.try_get("trade_id")?,
        broker_order_id: row.try_get("broker_order_id")?,
        side: Side::parse(&side).context("bad side in execution_orders row")?,
        order_type: OrderType::parse(&order_type).context("bad order_type in execution_orders row")?,
        requested_price: row.try_get("requested_price")?,
        requested_size: row.try_get("requested_size")?,
        status: OrderStatus::parse(&status).context("bad status in execution_orders row")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
