use chrono::NaiveDateTime;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another process has the database locked
    #[error("The feedwatch database is locked by another process. Close it and try again.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A write collided with the (website_id, title) uniqueness constraint
    #[error("Duplicate entry title rejected by storage")]
    DuplicateEntry,

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    /// Map sqlx errors that indicate SQLite lock contention
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let msg = err.to_string().to_lowercase();
        if msg.contains("unique constraint failed: entries.website_id, entries.title") {
            return StorageError::DuplicateEntry;
        }
        if msg.contains("database is locked")
            || msg.contains("database table is locked")
            || msg.contains("sqlite_busy")
            || msg.contains("sqlite_locked")
        {
            return StorageError::Locked;
        }
        StorageError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A tracked website.
///
/// `feed_url` stays `None` until discovery has run; the orchestrator rejects
/// sync attempts on such sites. `updated_at` is the ingestion watermark: the
/// normalized timestamp of the newest feed item at the last successful sync.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Website {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub feed_url: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A persisted feed entry. `(website_id, title)` is unique; entries are never
/// mutated after creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub website_id: i64,
    pub title: String,
    pub link: String,
    pub published: NaiveDateTime,
    pub fetched_at: i64,
}

/// An entry candidate produced by the fetch/dedup pipeline, not yet stored.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub website_id: i64,
    pub title: String,
    pub link: String,
    pub published: NaiveDateTime,
}
