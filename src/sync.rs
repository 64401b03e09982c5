//! The ingestion orchestrator: end-to-end "sync one site" and "sync all".
//!
//! One site's sync is fetch → dedup → persist-and-advance-watermark, the
//! last step in a single transaction so a crash can never leave the
//! watermark ahead of the entries it claims to cover. Failures abort only
//! the affected site; `sync_all` keeps going.

use crate::feed::{
    accept_latest_batch, dedupe_month_batch, fetch_latest, fetch_month, FetchError, SyncBatch,
};
use crate::notify::Notifier;
use crate::storage::{Database, StorageError, Website};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

/// How many sites sync concurrently in `sync_all`. Each website appears at
/// most once per pass, so no two syncs ever race on the same site.
const MAX_CONCURRENT_SYNCS: usize = 4;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The website has no feed URL yet — discovery must run first. Calling
    /// sync on such a site is an input-contract violation, rejected before
    /// any network traffic.
    #[error("website {0:?} has no feed URL; run discovery first")]
    FeedUrlMissing(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a successful sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing new: short-circuit hit, batch discarded, or no candidates.
    NoChange,
    /// This many entries were persisted and the watermark advanced.
    Synced(usize),
}

/// Which fetch mode drives the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Entries from the first item's calendar month (the default).
    Month,
    /// The `feed_max_count + 1` most recent entries.
    Latest,
}

/// Tunables threaded from configuration into each sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Bound for latest-N mode; the effective cap is `feed_max_count + 1`.
    pub feed_max_count: usize,
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Month,
            feed_max_count: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-site result row from [`sync_all`].
pub struct SiteSyncResult {
    pub website_id: i64,
    pub website_name: String,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Sync a single website.
///
/// # Errors
///
/// [`SyncError::FeedUrlMissing`] when discovery has not populated the feed
/// URL; fetch/parse/timestamp failures as [`SyncError::Fetch`]; persistence
/// failures as [`SyncError::Storage`] (the transaction rolls back, watermark
/// untouched).
pub async fn sync_website(
    db: &Database,
    client: &reqwest::Client,
    notifier: &dyn Notifier,
    website: &Website,
    opts: &SyncOptions,
) -> Result<SyncOutcome, SyncError> {
    let feed_url = website
        .feed_url
        .as_deref()
        .ok_or_else(|| SyncError::FeedUrlMissing(website.name.clone()))?;

    let batch: Option<SyncBatch> = match opts.mode {
        SyncMode::Month => {
            match fetch_month(db, client, website, feed_url, opts.request_timeout).await? {
                Some(candidates) => dedupe_month_batch(db, candidates).await?,
                None => None,
            }
        }
        SyncMode::Latest => {
            let candidates = fetch_latest(
                db,
                client,
                website,
                feed_url,
                opts.feed_max_count,
                opts.request_timeout,
            )
            .await?;
            accept_latest_batch(candidates)
        }
    };

    let Some(batch) = batch else {
        notifier.notify(&format!("No entries added for {}", website.name));
        return Ok(SyncOutcome::NoChange);
    };

    // Entries and watermark move together or not at all
    let inserted = db
        .complete_site_sync(website.id, &batch.entries, batch.watermark)
        .await?;

    if inserted == 0 {
        // Latest-N candidates can all collide with stored titles; the
        // uniqueness constraint dropped them silently
        notifier.notify(&format!("No entries added for {}", website.name));
        return Ok(SyncOutcome::NoChange);
    }

    tracing::info!(
        site = %website.name,
        entries = inserted,
        watermark = %batch.watermark,
        "Site synced"
    );
    notifier.notify(&format!(
        "{} entries added for {}",
        inserted, website.name
    ));
    Ok(SyncOutcome::Synced(inserted))
}

/// Sync every tracked website.
///
/// Sites run concurrently with bounded parallelism; one site's failure is
/// logged and reported in its result row, never aborting the others.
pub async fn sync_all(
    db: &Database,
    client: &reqwest::Client,
    notifier: &dyn Notifier,
    opts: &SyncOptions,
) -> Result<Vec<SiteSyncResult>, StorageError> {
    let websites = db.get_websites().await?;

    let results: Vec<SiteSyncResult> = stream::iter(websites.into_iter())
        .map(|website| async move {
            let result = sync_website(db, client, notifier, &website, opts).await;
            if let Err(e) = &result {
                tracing::warn!(site = %website.name, error = %e, "Site sync failed");
            }
            SiteSyncResult {
                website_id: website.id,
                website_name: website.name,
                result,
            }
        })
        .buffer_unordered(MAX_CONCURRENT_SYNCS)
        .collect()
        .await;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::test_support::RecordingNotifier;
    use crate::storage::Website;

    #[tokio::test]
    async fn test_sync_without_feed_url_rejected_explicitly() {
        let db = Database::open(":memory:").await.unwrap();
        let client = reqwest::Client::new();
        let notifier = RecordingNotifier::default();

        let website = Website {
            id: 1,
            name: "NoFeed".to_string(),
            url: "https://example.com".to_string(),
            feed_url: None,
            updated_at: None,
        };

        let err = sync_website(&db, &client, &notifier, &website, &SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::FeedUrlMissing(name) if name == "NoFeed"));
        // Rejected before any notice is emitted
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_all_isolates_per_site_failures() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
                         <item><title>A</title><link>https://e.com/a</link>\
                         <pubDate>Fri, 08 Jan 2021 11:00:00 +0900</pubDate></item>\
                         </channel></rss>",
                    )
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .mount(&server)
            .await;

        let db = Database::open(":memory:").await.unwrap();
        // One healthy site, one pointing at a dead port, one with no feed URL
        let good = db
            .insert_website("Good", "https://good.example")
            .await
            .unwrap();
        db.set_feed_url(good, &format!("{}/feed.xml", server.uri()))
            .await
            .unwrap();
        let bad = db
            .insert_website("Bad", "https://bad.example")
            .await
            .unwrap();
        db.set_feed_url(bad, "http://127.0.0.1:1/feed.xml")
            .await
            .unwrap();
        db.insert_website("Unboarded", "https://new.example")
            .await
            .unwrap();

        let client = reqwest::Client::new();
        let notifier = RecordingNotifier::default();
        let results = sync_all(&db, &client, &notifier, &SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let by_name = |name: &str| {
            results
                .iter()
                .find(|r| r.website_name == name)
                .unwrap()
        };
        assert!(matches!(
            by_name("Good").result,
            Ok(SyncOutcome::Synced(1))
        ));
        assert!(matches!(
            by_name("Bad").result,
            Err(SyncError::Fetch(_))
        ));
        assert!(matches!(
            by_name("Unboarded").result,
            Err(SyncError::FeedUrlMissing(_))
        ));
    }
}
