//! Postgres pool and embedded migrations.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Open a connection pool against `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run the embedded schema migrations (`crates/infra/migrations`).
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}
