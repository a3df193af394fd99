use assert_cmd::prelude::*;
use chrono::Utc;
use predicates::prelude::*;
use rust_decimal_macros::dec;
use trx_schemas::{Side, Signal};
use uuid::Uuid;

fn buy_signal() -> Signal {
    Signal {
        signal_id: Uuid::new_v4(),
        strategy_decision_id: Uuid::new_v4(),
        direction: Side::Buy,
        entry_price: dec!(2000.00),
        stop_loss: dec!(1990.00),
        take_profit: dec!(2020.00),
        rr_ratio: dec!(2.0),
        risk_fraction: dec!(0.005),
        leverage: dec!(100),
        position_size: dec!(0.10),
        margin_required: dec!(2.00),
        candle_ts: Utc::now(),
    }
}

/// `trx-cli process-signal` places the entry order and exits 0 (spec §6).
#[tokio::test]
async fn cli_process_signal_succeeds_and_exits_zero() -> anyhow::Result<()> {
    let url = match std::env::var(trx_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {} not set", trx_db::ENV_DB_URL);
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(2).connect(&url).await?;
    trx_db::migrate(&pool).await?;

    let signal = buy_signal();
    trx_db::signals::insert_signal(&pool, &signal).await?;

    let audit_log = std::env::temp_dir().join(format!("trx-cli-test-{}.jsonl", Uuid::new_v4()));

    let mut cmd = assert_cmd::Command::cargo_bin("trx-cli")?;
    cmd.env(trx_db::ENV_DB_URL, &url)
        .args(["--audit-log", audit_log.to_str().unwrap(), "process-signal", &signal.signal_id.to_string()]);

    cmd.assert().success().stdout(predicate::str::contains("success=true"));

    Ok(())
}

/// A signal that risks more than the default cap is rejected and the process
/// exits 1, matching the §6 exit-code table.
#[tokio::test]
async fn cli_process_signal_risk_rejected_exits_one() -> anyhow::Result<()> {
    let url = match std::env::var(trx_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {} not set", trx_db::ENV_DB_URL);
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(2).connect(&url).await?;
    trx_db::migrate(&pool).await?;

    let mut signal = buy_signal();
    signal.risk_fraction = dec!(0.05); // default cap is 0.01
    trx_db::signals::insert_signal(&pool, &signal).await?;

    let audit_log = std::env::temp_dir().join(format!("trx-cli-test-{}.jsonl", Uuid::new_v4()));

    let mut cmd = assert_cmd::Command::cargo_bin("trx-cli")?;
    cmd.env(trx_db::ENV_DB_URL, &url)
        .args(["--audit-log", audit_log.to_str().unwrap(), "process-signal", &signal.signal_id.to_string()]);

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("success=false"))
        .stdout(predicate::str::contains("RISK_REJECTED"));

    Ok(())
}
