use chrono::NaiveDateTime;

use super::schema::Database;
use super::types::{StorageError, Website};

impl Database {
    /// Register a tracked website. Returns its id.
    ///
    /// Re-registering an existing name updates the site URL and keeps the
    /// watermark and feed URL intact.
    pub async fn insert_website(&self, name: &str, url: &str) -> Result<i64, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO websites (name, url)
            VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET url = excluded.url
        "#,
        )
        .bind(name)
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM websites WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;
        Ok(id)
    }

    /// All tracked websites, ordered by name.
    pub async fn get_websites(&self) -> Result<Vec<Website>, StorageError> {
        let websites = sqlx::query_as::<_, Website>(
            "SELECT id, name, url, feed_url, updated_at FROM websites ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;
        Ok(websites)
    }

    pub async fn get_website_by_name(&self, name: &str) -> Result<Option<Website>, StorageError> {
        let website = sqlx::query_as::<_, Website>(
            "SELECT id, name, url, feed_url, updated_at FROM websites WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;
        Ok(website)
    }

    /// Record a discovered feed URL for a website.
    pub async fn set_feed_url(&self, website_id: i64, feed_url: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE websites SET feed_url = ? WHERE id = ?")
            .bind(feed_url)
            .bind(website_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;
        Ok(())
    }

    /// Advance a website's watermark outside of a sync transaction.
    ///
    /// Regular syncs go through `complete_site_sync`, which moves the
    /// watermark together with the entries it covers; this is for
    /// administrative correction only.
    pub async fn update_watermark(
        &self,
        website_id: i64,
        watermark: NaiveDateTime,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE websites SET updated_at = ? WHERE id = ?")
            .bind(watermark)
            .bind(website_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = test_db().await;
        let id = db
            .insert_website("Example", "https://example.com")
            .await
            .unwrap();
        assert!(id > 0);

        let sites = db.get_websites().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "Example");
        assert!(sites[0].feed_url.is_none());
        assert!(sites[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn test_reinsert_same_name_keeps_id_and_state() {
        let db = test_db().await;
        let id1 = db
            .insert_website("Example", "https://example.com")
            .await
            .unwrap();
        db.set_feed_url(id1, "https://example.com/feed.xml")
            .await
            .unwrap();

        let id2 = db
            .insert_website("Example", "https://example.org")
            .await
            .unwrap();
        assert_eq!(id1, id2);

        let site = db.get_website_by_name("Example").await.unwrap().unwrap();
        assert_eq!(site.url, "https://example.org");
        assert_eq!(site.feed_url.as_deref(), Some("https://example.com/feed.xml"));
    }

    #[tokio::test]
    async fn test_update_watermark() {
        let db = test_db().await;
        let id = db
            .insert_website("Example", "https://example.com")
            .await
            .unwrap();

        let mark = chrono::NaiveDate::from_ymd_opt(2021, 1, 8)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        db.update_watermark(id, mark).await.unwrap();

        let site = db.get_website_by_name("Example").await.unwrap().unwrap();
        assert_eq!(site.updated_at, Some(mark));
    }
}
