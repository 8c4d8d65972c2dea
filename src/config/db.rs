// src/config/db.rs
// DOCUMENTATION: Database connection pool initialization
// PURPOSE: Open the PostgreSQL pool the unit-of-work factory runs on

use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open the PostgreSQL connection pool.
/// Every pool knob (size, acquire/idle timeouts, connection lifetime) is
/// sourced from Config so deployments can tune them per environment.
/// Runs a probe query so a bad DATABASE_URL fails at startup rather than
/// on the first request.
pub async fn init_db_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    log::info!(
        "Connecting to PostgreSQL (max {} connections)",
        config.db_max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.pool_acquire_timeout())
        .idle_timeout(config.pool_idle_timeout())
        .max_lifetime(config.pool_max_lifetime())
        .connect(&config.database_url)
        .await?;

    // Startup probe
    sqlx::query("SELECT 1").execute(&pool).await?;

    log::info!("Database pool ready");
    Ok(pool)
}
