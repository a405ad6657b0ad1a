use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;

/// Creates the pool backing the screening result cache.
///
/// Expects the `screening_results` and `job_descriptions` tables to exist.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("connecting to the result cache database")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
