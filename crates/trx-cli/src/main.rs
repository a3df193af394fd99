mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

use commands::admin::{self, GlobalOpts};

#[derive(Parser)]
#[command(name = "trx-cli")]
#[command(about = "Trade execution engine admin CLI (spec §6)", long_about = None)]
struct Cli {
    /// Engine identity recorded on every audit record this invocation writes.
    #[arg(long, global = true, default_value_t = Uuid::new_v4())]
    engine_id: Uuid,

    /// Instrument this engine trades.
    #[arg(long, global = true, default_value = "XAUUSD")]
    instrument: String,

    #[arg(long, global = true, default_value = "H1")]
    timeframe: String,

    /// Starting paper-account balance.
    #[arg(long, global = true, default_value = "10000")]
    account_balance: Decimal,

    /// Bounded per-trade reducer queue depth (spec §9).
    #[arg(long, global = true, default_value_t = 64)]
    queue_capacity: usize,

    /// Append-only audit log path.
    #[arg(long, global = true, default_value = "trx-audit.jsonl")]
    audit_log: PathBuf,

    /// Chain each audit record's hash to the previous one.
    #[arg(long, global = true)]
    hash_chain: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Risk-validate a signal and place its entry order (spec §6).
    ProcessSignal { signal_id: Uuid },

    /// Cancel a trade that has not yet opened a position (spec §6).
    CancelTrade { trade_id: Uuid },

    /// Print a trade's current state.
    Status { trade_id: Uuid },

    /// List all open positions.
    Positions,

    /// Print open-trade and open-position counts.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let pool = trx_db::connect_from_env().await.context("connect to database")?;
    trx_db::migrate(&pool).await.context("run migrations")?;

    let opts = GlobalOpts {
        engine_id: cli.engine_id,
        instrument: cli.instrument,
        timeframe: cli.timeframe,
        account_balance: cli.account_balance,
        queue_capacity: cli.queue_capacity,
        audit_log: cli.audit_log,
        hash_chain: cli.hash_chain,
    };
    let orchestrator = admin::build_orchestrator(pool, &opts).await?;

    let exit_code = match cli.cmd {
        Commands::ProcessSignal { signal_id } => admin::process_signal(&orchestrator, signal_id).await,
        Commands::CancelTrade { trade_id } => admin::cancel_trade(&orchestrator, trade_id).await,
        Commands::Status { trade_id } => admin::status(&orchestrator, trade_id).await,
        Commands::Positions => admin::positions(&orchestrator).await,
        Commands::Stats => admin::stats(&orchestrator).await,
    };

    std::process::exit(exit_code);
}
