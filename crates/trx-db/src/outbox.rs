use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub outbox_id: i64,
    pub trade_id: Uuid,
    pub idempotency_key: String,
    pub order_request: Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Enqueue an order intent keyed by a deterministic idempotency key (one
/// entry order + up to two bracket orders per trade). Returns `false` if a
/// row with this key already exists — the caller must not re-dispatch.
pub async fn enqueue(pool: &PgPool, trade_id: Uuid, idempotency_key: &str, order_request: Value) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        insert into execution_outbox (trade_id, idempotency_key, order_request, status)
        values ($1, $2, $3, 'PENDING')
        on conflict (idempotency_key) do nothing
        returning outbox_id
        "#,
    )
    .bind(trade_id)
    .bind(idempotency_key)
    .bind(order_request)
    .fetch_optional(pool)
    .await
    .context("outbox enqueue failed")?;
    Ok(row.is_some())
}

/// Claim up to `batch_size` PENDING rows for exclusive dispatch, via
/// `FOR UPDATE SKIP LOCKED` so a crashed dispatcher's in-flight claim never
/// blocks a fresh one from picking the row back up after recovery.
pub async fn claim_batch(pool: &PgPool, batch_size: i64, dispatcher_id: &str) -> Result<Vec<OutboxRow>> {
    let rows = sqlx::query(
        r#"
        with to_claim as (
            select outbox_id
            from execution_outbox
            where status = 'PENDING'
            order by outbox_id asc
            limit $1
            for update skip locked
        )
        update execution_outbox
        set status = 'CLAIMED', claimed_at = now(), claimed_by = $2
        where outbox_id in (select outbox_id from to_claim)
        returning outbox_id, trade_id, idempotency_key, order_request, status,
                  created_at, claimed_at, claimed_by, sent_at
        "#,
    )
    .bind(batch_size)
    .bind(dispatcher_id)
    .fetch_all(pool)
    .await
    .context("outbox claim_batch failed")?;

    rows.into_iter().map(row_to_outbox).collect()
}

pub async fn mark_sent(pool: &PgPool, idempotency_key: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        update execution_outbox
        set status = 'SENT', sent_at = coalesce(sent_at, now())
        where idempotency_key = $1 and status = 'CLAIMED'
        returning outbox_id
        "#,
    )
    .bind(idempotency_key)
    .fetch_optional(pool)
    .await
    .context("outbox mark_sent failed")?;
    Ok(row.is_some())
}

pub async fn mark_acked(pool: &PgPool, idempotency_key: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "update execution_outbox set status = 'ACKED' where idempotency_key = $1 returning outbox_id",
    )
    .bind(idempotency_key)
    .fetch_optional(pool)
    .await
    .context("outbox mark_acked failed")?;
    Ok(row.is_some())
}

pub async fn mark_failed(pool: &PgPool, idempotency_key: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        update execution_outbox
        set status = 'FAILED'
        where idempotency_key = $1 and status = 'CLAIMED'
        returning outbox_id
        "#,
    )
    .bind(idempotency_key)
    .fetch_optional(pool)
    .await
    .context("outbox mark_failed failed")?;
    Ok(row.is_some())
}

/// Crash-recovery replay: rows left in a non-terminal state by a dead
/// dispatcher.
pub async fn list_unacked_for_trade(pool: &PgPool, trade_id: Uuid) -> Result<Vec<OutboxRow>> {
    let rows = sqlx::query(
        r#"
        select outbox_id, trade_id, idempotency_key, order_request, status,
               created_at, claimed_at, claimed_by, sent_at
        from execution_outbox
        where trade_id = $1 and status in ('PENDING', 'CLAIMED', 'SENT', 'FAILED')
        order by outbox_id asc
        "#,
    )
    .bind(trade_id)
    .fetch_all(pool)
    .await
    .context("outbox list_unacked_for_trade failed")?;
    rows.into_iter().map(row_to_outbox).collect()
}

fn row_to_outbox(row: sqlx::postgres::PgRow) -> Result<OutboxRow> {
    Ok(OutboxRow {
        outbox_id: row.try_get("outbox_id")?,
        trade_id: row.try_get("trade_id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        order_request: row.try_get("order_request")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        claimed_at: row.try_get("claimed_at")?,
        claimed_by: row.try_get("claimed_by")?,
        sent_at: row.try_get("sent_at")?,
    })
}
