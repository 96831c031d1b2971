//! Postgres access for the signal store.

pub mod signals;

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Signal schema migrations, embedded at compile time so the batch
/// runner needs no migrations directory on disk.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect a pool sized for one sequential batch run.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Bring the signal schema up to date. Safe to run on every start.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
