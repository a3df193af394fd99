//! The admin surface (§6): `process-signal`, `cancel-trade`, `status`,
//! `positions`, `stats`. Each handler prints `key=value` lines and returns
//! the process exit code its outcome maps to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use trx_audit::AuditWriter;
use trx_broker_paper::PaperBroker;
use trx_config::{PaperBrokerConfig, RetryConfig, RiskLimitsConfig};
use trx_execution::{ExecutionOrchestrator, NoopRiskLedgerSink};
use trx_schemas::ExecutionMode;

/// Settings shared by every subcommand: how to construct the orchestrator
/// this invocation of the binary drives. Each invocation is a fresh process,
/// so there is no persistent engine identity across calls beyond what the
/// caller passes in (e.g. a pinned `--engine-id` in a wrapper script).
pub struct GlobalOpts {
    pub engine_id: Uuid,
    pub instrument: String,
    pub timeframe: String,
    pub account_balance: Decimal,
    pub queue_capacity: usize,
    pub audit_log: PathBuf,
    pub hash_chain: bool,
}

pub async fn build_orchestrator(pool: PgPool, opts: &GlobalOpts) -> Result<Arc<ExecutionOrchestrator>> {
    let broker = Arc::new(PaperBroker::new(PaperBrokerConfig::default(), "trx-cli", opts.account_balance));
    let audit = AuditWriter::new(&opts.audit_log, opts.hash_chain)
        .with_context(|| format!("open audit log {:?}", opts.audit_log))?;

    let orchestrator = ExecutionOrchestrator::new(
        pool,
        broker,
        RiskLimitsConfig::default(),
        RetryConfig::default(),
        audit,
        opts.engine_id,
        opts.instrument.clone(),
        opts.timeframe.clone(),
        ExecutionMode::Paper,
        opts.queue_capacity,
        Arc::new(NoopRiskLedgerSink),
    );
    orchestrator.start().await;
    Ok(orchestrator)
}

pub async fn process_signal(orchestrator: &ExecutionOrchestrator, signal_id: Uuid) -> i32 {
    let outcome = orchestrator.process_signal(signal_id).await;
    println!("success={}", outcome.success);
    if let Some(trade_id) = outcome.trade_id {
        println!("trade_id={trade_id}");
    }
    if let Some(status) = outcome.status {
        println!("status={status:?}");
    }
    match outcome.error {
        Some(error) => {
            println!("error_kind={}", error.kind);
            println!("error_message={}", error.message);
            error.exit_code
        }
        None => 0,
    }
}

pub async fn cancel_trade(orchestrator: &ExecutionOrchestrator, trade_id: Uuid) -> i32 {
    match orchestrator.cancel_trade(trade_id).await {
        Ok(()) => {
            println!("success=true");
            println!("trade_id={trade_id}");
            0
        }
        Err(e) => {
            println!("success=false");
            println!("error={e}");
            e.exit_code()
        }
    }
}

pub async fn status(orchestrator: &ExecutionOrchestrator, trade_id: Uuid) -> i32 {
    match orchestrator.get_execution_status(trade_id).await {
        Ok(Some(trade)) => {
            println!("found=true");
            println!("trade_id={}", trade.trade_id);
            println!("status={:?}", trade.status);
            println!("side={:?}", trade.side);
            println!("instrument={}", trade.instrument);
            println!("position_size={}", trade.position_size);
            println!("opened_at={}", opt_dt(&trade.opened_at));
            println!("closed_at={}", opt_dt(&trade.closed_at));
            println!("close_reason={}", trade.close_reason.map(|r| format!("{r:?}")).unwrap_or_default());
            0
        }
        Ok(None) => {
            println!("found=false");
            3
        }
        Err(e) => {
            println!("error={e}");
            e.exit_code()
        }
    }
}

pub async fn positions(orchestrator: &ExecutionOrchestrator) -> i32 {
    match orchestrator.get_active_positions().await {
        Ok(positions) => {
            println!("count={}", positions.len());
            for p in positions {
                println!(
                    "position_id={} trade_id={} side={:?} size={} avg_entry_price={}",
                    p.position_id, p.trade_id, p.side, p.size, p.avg_entry_price
                );
            }
            0
        }
        Err(e) => {
            println!("error={e}");
            e.exit_code()
        }
    }
}

pub async fn stats(orchestrator: &ExecutionOrchestrator) -> i32 {
    match orchestrator.get_execution_stats().await {
        Ok(stats) => {
            println!("open_trade_count={}", stats.open_trade_count);
            println!("open_position_count={}", stats.open_position_count);
            0
        }
        Err(e) => {
            println!("error={e}");
            e.exit_code()
        }
    }
}

fn opt_dt(dt: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    dt.as_ref().map(|d| d.to_rfc3339()).unwrap_or_default()
}
