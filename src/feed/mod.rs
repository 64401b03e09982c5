//! Feed ingestion: discovery, fetching, parsing, and deduplication.
//!
//! - [`parser`] - RSS/Atom XML into a [`parser::FeedSnapshot`], raw
//!   timestamps preserved for the normalizer
//! - [`discovery`] - site URL to feed URL
//! - [`fetcher`] - the month-scoped and latest-N fetch modes
//! - [`dedup`] - new-entry decisions against stored state

mod dedup;
mod discovery;
mod fetcher;
mod parser;

pub use dedup::{accept_latest_batch, dedupe_month_batch, SyncBatch};
pub use discovery::{discover_feed_url, DiscoveryError};
pub use fetcher::{fetch_latest, fetch_month, fetch_snapshot, FetchError, MonthCandidates};
pub use parser::{parse_feed, FeedItem, FeedSnapshot, ParseError};
