//! Database access for intake-api

pub mod applications;

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Initialize database connection pool
///
/// `database_url` is any sqlx SQLite URL (`sqlite://intake.db?mode=rwc`,
/// `sqlite::memory:`).
pub async fn init_database_pool(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database at {database_url}"))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the applications table and its indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> intake_common::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            mobile_number TEXT NOT NULL,
            target_city TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            document TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_applications_full_name ON applications(full_name)",
        "CREATE INDEX IF NOT EXISTS idx_applications_email ON applications(email)",
        "CREATE INDEX IF NOT EXISTS idx_applications_mobile_number ON applications(mobile_number)",
        "CREATE INDEX IF NOT EXISTS idx_applications_created_at ON applications(created_at)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database tables initialized (applications)");

    Ok(())
}
