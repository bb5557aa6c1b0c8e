// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::info;

/// Run all database migrations
///
/// Tables are created if they don't exist; an already-provisioned database
/// is left untouched.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

/// Users table: one row per email. `username` is generated once at creation
/// and never updated; `provider`/`provider_id` reflect the last login.
async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT '',
            picture TEXT NOT NULL DEFAULT '',
            username TEXT NOT NULL UNIQUE,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            last_login TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_provider ON users(provider, provider_id)")
        .execute(pool)
        .await?;

    Ok(())
}
