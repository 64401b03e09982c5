//! Feed fetching: HTTP retrieval plus the two ingestion modes.
//!
//! Both modes share the same skeleton — fetch, parse, watermark
//! short-circuit — and differ in how they bound the result:
//!
//! - **Month-scoped** keeps items sharing the first item's calendar month
//!   and stops at the first month boundary (feeds are newest-first, so a
//!   boundary means the rest are older).
//! - **Latest-N** keeps at most `max_count + 1` items. The `+ 1` is a
//!   compatibility quirk of the stored state this crate replaces and is
//!   preserved exactly.

use crate::feed::parser::{parse_feed, FeedItem, FeedSnapshot, ParseError};
use crate::storage::{Database, NewEntry, StorageError, Website};
use crate::timestamp::{parse_feed_timestamp, TimestampError};
use chrono::{Datelike, NaiveDateTime};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur during feed fetching operations.
///
/// Any of these aborts the current site's sync attempt; none of them is
/// retried automatically.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// A feed timestamp could not be normalized
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampError),
    /// Month-scoped fetch found a feed with zero items (no first entry to
    /// anchor the month on)
    #[error("Feed has no items")]
    EmptyFeed,
    /// The has-entries short-circuit check failed at the store
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A month-scoped batch of candidates plus the watermark a successful sync
/// should advance to (the first raw item's normalized timestamp).
#[derive(Debug)]
pub struct MonthCandidates {
    pub candidates: Vec<NewEntry>,
    pub watermark: NaiveDateTime,
}

/// Fetch and parse a feed document into a [`FeedSnapshot`].
pub async fn fetch_snapshot(
    client: &reqwest::Client,
    feed_url: &str,
    timeout: Duration,
) -> Result<FeedSnapshot, FetchError> {
    let response = tokio::time::timeout(timeout, client.get(feed_url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    Ok(parse_feed(&bytes)?)
}

/// Month-scoped fetch: candidates sharing the first item's calendar month.
///
/// Returns `Ok(None)` when the watermark short-circuit fires — the feed's
/// updated timestamp (or, for feeds without one, the first item's own
/// timestamp) equals the stored watermark and the store already holds
/// entries for this site.
///
/// # Errors
///
/// [`FetchError::EmptyFeed`] for a feed with zero items; timestamp and parse
/// failures abort the fetch.
pub async fn fetch_month(
    db: &Database,
    client: &reqwest::Client,
    website: &Website,
    feed_url: &str,
    timeout: Duration,
) -> Result<Option<MonthCandidates>, FetchError> {
    let snapshot = fetch_snapshot(client, feed_url, timeout).await?;

    if snapshot.items.is_empty() {
        return Err(FetchError::EmptyFeed);
    }

    let first_ts = item_timestamp(&snapshot.items[0])?;

    let reference_ts = match snapshot.updated_raw.as_deref() {
        Some(raw) => parse_feed_timestamp(raw)?,
        None => first_ts,
    };
    if website.updated_at == Some(reference_ts) && db.has_entries(website.id).await? {
        tracing::debug!(site = %website.name, "Feed unchanged since last sync, skipping");
        return Ok(None);
    }

    // Month-of-year only: Jan entries group together even across years.
    // Correct in practice because feeds are newest-first and the scan stops
    // at the first boundary.
    let month = first_ts.month();
    let mut candidates = Vec::new();
    for item in &snapshot.items {
        let ts = item_timestamp(item)?;
        if ts.month() != month {
            break;
        }
        candidates.push(NewEntry {
            website_id: website.id,
            title: item.title.clone(),
            link: item.link.clone(),
            published: ts,
        });
    }

    Ok(Some(MonthCandidates {
        candidates,
        watermark: first_ts,
    }))
}

/// Latest-N fetch: at most `max_count + 1` most recent items.
///
/// A feed without a feed-level updated timestamp yields an empty result
/// unconditionally; so does the watermark short-circuit. A feed with zero
/// items is an empty result, not an error.
pub async fn fetch_latest(
    db: &Database,
    client: &reqwest::Client,
    website: &Website,
    feed_url: &str,
    max_count: usize,
    timeout: Duration,
) -> Result<Vec<NewEntry>, FetchError> {
    let snapshot = fetch_snapshot(client, feed_url, timeout).await?;

    let feed_updated = match snapshot.updated_raw.as_deref() {
        Some(raw) => parse_feed_timestamp(raw)?,
        None => return Ok(Vec::new()),
    };
    if website.updated_at == Some(feed_updated) && db.has_entries(website.id).await? {
        tracing::debug!(site = %website.name, "Feed unchanged since last sync, skipping");
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for item in snapshot.items.iter().take(max_count + 1) {
        candidates.push(NewEntry {
            website_id: website.id,
            title: item.title.clone(),
            link: item.link.clone(),
            published: item_timestamp(item)?,
        });
    }
    Ok(candidates)
}

fn item_timestamp(item: &FeedItem) -> Result<NaiveDateTime, FetchError> {
    let raw = item
        .published_raw
        .as_deref()
        .ok_or(TimestampError::Missing)?;
    Ok(parse_feed_timestamp(raw)?)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
