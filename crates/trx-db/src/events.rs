use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use trx_schemas::{EventType, TradeEvent, TradeStatus};
use uuid::Uuid;

/// Append-only: every status change has exactly one corresponding event (I3).
pub async fn append_event(pool: &PgPool, event: &TradeEvent) -> Result<()> {
    sqlx::query(
        r#"
        insert into execution_trade_events
            (event_id, trade_id, event_type, previous_status, new_status, metadata, created_at)
        values ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.event_id)
    .bind(event.trade_id)
    .bind(event.event_type.as_str())
    .bind(event.previous_status.map(|s| s.as_str()))
    .bind(event.new_status.as_str())
    .bind(&event.metadata)
    .bind(event.created_at)
    .execute(pool)
    .await
    .context("append_event failed")?;
    Ok(())
}

/// Ordered by `created_at` — event timestamps for a trade are non-decreasing (I5).
pub async fn list_for_trade(pool: &PgPool, trade_id: Uuid) -> Result<Vec<TradeEvent>> {
    let rows = sqlx::query(
        r#"
        select event_id, trade_id, event_type, previous_status, new_status, metadata, created_at
        from execution_trade_events
        where trade_id = $1
        order by created_at asc
        "#,
    )
    .bind(trade_id)
    .fetch_all(pool)
    .await
    .context("list_for_trade failed")?;
    rows.into_iter().map(row_to_event).collect()
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<TradeEvent> {
    let event_type: String = row.try_get("event_type")?;
    let previous_status: Option<String> = row.try_get("previous_status")?;
    let new_status: String = row.try_get("new_status")?;

    Ok(TradeEvent {
        event_id: row.try_get("event_id")?,
        trade_id: row.try_get("trade_id")?,
        event_type: EventType::parse(&event_type).context("bad event_type in event row")?,
        previous_status: previous_status
            .map(|s| TradeStatus::parse(&s).context("bad previous_status in event row"))
            .transpose()?,
        new_status: TradeStatus::parse(&new_status).context("bad new_status in event row")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}
