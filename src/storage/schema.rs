use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// `path` may be `:memory:` for tests.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Locked` if another process has the database
    /// locked, `StorageError::Migration` if schema setup fails.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY. Set via pragma so every pooled
        // connection inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run schema migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op. A failure mid-way rolls the whole migration back.
    async fn migrate(&self) -> Result<(), StorageError> {
        // Per-connection setting, must run outside the transaction
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::from_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS websites (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                url TEXT NOT NULL,
                feed_url TEXT,
                updated_at TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                website_id INTEGER NOT NULL REFERENCES websites(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                published TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                UNIQUE(website_id, title)
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_website ON entries(website_id)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_published ON entries(published DESC)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

        tx.commit().await.map_err(StorageError::from_sqlx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open(":memory:").await.unwrap();
        // Migration is idempotent
        db.migrate().await.unwrap();
    }
}
