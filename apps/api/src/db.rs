use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::hash_password;

/// Id of the bootstrap administrator. This account can never be deleted.
pub const PRIMARY_ADMIN_ID: i64 = 1;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies every pending migration. Already-applied versions are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// Inserts the primary admin account if it does not exist yet. Returns
/// `true` only when this call created it.
pub async fn ensure_primary_admin(pool: &PgPool, initial_password: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(PRIMARY_ADMIN_ID)
        .fetch_one(pool)
        .await?;
    if exists {
        return Ok(false);
    }

    let hash = hash_password(initial_password).context("failed to hash admin password")?;
    let inserted = sqlx::query(
        "INSERT INTO users (id, username, password_hash, role) VALUES ($1, 'admin', $2, 'admin') \
         ON CONFLICT DO NOTHING",
    )
    .bind(PRIMARY_ADMIN_ID)
    .bind(hash)
    .execute(pool)
    .await?
    .rows_affected();
    if inserted == 0 {
        return Ok(false);
    }

    // The explicit id bypassed the sequence.
    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('users', 'id'), GREATEST((SELECT MAX(id) FROM users), 1))",
    )
    .execute(pool)
    .await?;

    warn!("Created primary admin account 'admin'; change its password after first login");
    Ok(true)
}
