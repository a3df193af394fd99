//! Postgres persistence for the execution engine.
//!
//! Uses runtime-checked `sqlx::query`/`query_as` (no `query!` macros) so the
//! crate builds without a live database. Enum columns are stored as their
//! `as_str()`/`parse()` text representation from `trx-schemas`.

pub mod closure;
pub mod events;
pub mod executions;
pub mod orders;
pub mod outbox;
pub mod positions;
pub mod signals;
pub mod trades;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub const ENV_DB_URL: &str = "TRX_DATABASE_URL";

pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connect + migrate in one call, for integration tests against a scratch DB.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}
