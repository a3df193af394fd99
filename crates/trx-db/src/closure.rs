use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use trx_schemas::{CloseReason, EventType, TradeEvent, TradeStatus};
use uuid::Uuid;

/// The Position Closure Service's persisted side (spec §4.7): Position
/// update, ExecutionTrade update, and the closure TradeEvent all commit or
/// roll back together. The broker close call happens *before* this is
/// invoked and is intentionally outside the transaction boundary — the venue
/// is external to it.
pub struct ClosureWrite {
    pub trade_id: Uuid,
    pub previous_status: TradeStatus,
    pub reason: CloseReason,
    pub closed_at: DateTime<Utc>,
    pub realized_pnl: Decimal,
}

/// Commits the four closure mutations atomically. If the transaction fails
/// to commit, the caller (broker close already durable) must record a
/// reconciliation task rather than retry the close (spec §4.7).
pub async fn commit_closure(pool: &PgPool, write: &ClosureWrite) -> Result<()> {
    let mut tx = pool.begin().await.context("commit_closure: begin failed")?;

    sqlx::query("update positions set closed_at = $2 where trade_id = $1")
        .bind(write.trade_id)
        .bind(write.closed_at)
        .execute(&mut *tx)
        .await
        .context("commit_closure: position update failed")?;

    sqlx::query(
        r#"
        update execution_trades
        set status = 'CLOSED', close_reason = $2, closed_at = $3, updated_at = $3
        where trade_id = $1
        "#,
    )
    .bind(write.trade_id)
    .bind(write.reason.as_str())
    .bind(write.closed_at)
    .execute(&mut *tx)
    .await
    .context("commit_closure: trade update failed")?;

    // One event per status change (I3): the prior status is whatever state
    // the trade was actually in before this close (OPEN for a TP/SL fill,
    // but VALIDATED/ORDER_PLACED/PARTIALLY_FILLED for a cancellation) — a
    // single CLOSED event carries the specific trigger (TP/SL/MANUAL/ERROR)
    // and the realized P&L in its metadata rather than emitting a separate
    // TP_HIT/SL_HIT/MANUAL_CLOSE/ERROR event alongside it.
    let metadata = serde_json::json!({
        "trigger": write.reason.as_str(),
        "realized_pnl": write.realized_pnl.to_string(),
    });
    let closure_event = TradeEvent {
        event_id: Uuid::new_v4(),
        trade_id: write.trade_id,
        event_type: EventType::Closed,
        previous_status: Some(write.previous_status),
        new_status: TradeStatus::Closed,
        metadata,
        created_at: write.closed_at,
    };

    sqlx::query(
        r#"
        insert into execution_trade_events
            (event_id, trade_id, event_type, previous_status, new_status, metadata, created_at)
        values ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(closure_event.event_id)
    .bind(closure_event.trade_id)
    .bind(closure_event.event_type.as_str())
    .bind(closure_event.previous_status.map(|s| s.as_str()))
    .bind(closure_event.new_status.as_str())
    .bind(&closure_event.metadata)
    .bind(closure_event.created_at)
    .execute(&mut *tx)
    .await
    .context("commit_closure: event append failed")?;

    tx.commit().await.context("commit_closure: commit failed")?;
    Ok(())
}
