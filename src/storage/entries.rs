use chrono::NaiveDateTime;

use super::schema::Database;
use super::types::{Entry, NewEntry, StorageError};

impl Database {
    /// Look up a stored entry by its identity pair `(website_id, title)`.
    pub async fn find_entry(
        &self,
        website_id: i64,
        title: &str,
    ) -> Result<Option<Entry>, StorageError> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, website_id, title, link, published, fetched_at
            FROM entries
            WHERE website_id = ? AND title = ?
        "#,
        )
        .bind(website_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;
        Ok(entry)
    }

    /// Whether the store holds any entry at all for this website.
    /// Used by the fetch short-circuit: an unchanged watermark only means
    /// "nothing new" once a first sync has actually landed entries.
    pub async fn has_entries(&self, website_id: i64) -> Result<bool, StorageError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM entries WHERE website_id = ?")
                .bind(website_id)
                .fetch_one(&self.pool)
                .await
                .map_err(StorageError::from_sqlx)?;
        Ok(count > 0)
    }

    /// All entries for a website, newest first.
    pub async fn entries_for_website(&self, website_id: i64) -> Result<Vec<Entry>, StorageError> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, website_id, title, link, published, fetched_at
            FROM entries
            WHERE website_id = ?
            ORDER BY published DESC, fetched_at DESC
        "#,
        )
        .bind(website_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;
        Ok(entries)
    }

    /// Complete a site sync atomically: persist entries and advance the
    /// watermark in a single transaction.
    ///
    /// If any step fails the whole transaction rolls back — the watermark is
    /// never advanced without the entries it covers being durable, and
    /// vice versa.
    ///
    /// Inserts use `INSERT OR IGNORE` against the `(website_id, title)`
    /// uniqueness constraint, so re-persisting candidates that raced in from
    /// a concurrent fetch is harmless.
    ///
    /// # Returns
    ///
    /// The number of newly inserted entries (duplicates ignored, not counted).
    pub async fn complete_site_sync(
        &self,
        website_id: i64,
        entries: &[NewEntry],
        watermark: NaiveDateTime,
    ) -> Result<usize, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(StorageError::from_sqlx)?;

        let mut inserted = 0usize;
        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO entries (website_id, title, link, published, fetched_at)
                VALUES (?, ?, ?, ?, ?)
            "#,
            )
            .bind(website_id)
            .bind(&entry.title)
            .bind(&entry.link)
            .bind(entry.published)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from_sqlx)?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        sqlx::query("UPDATE websites SET updated_at = ? WHERE id = ?")
            .bind(watermark)
            .bind(website_id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from_sqlx)?;

        tx.commit().await.map_err(StorageError::from_sqlx)?;
        Ok(inserted)
    }
}
