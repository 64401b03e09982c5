//! Incremental RSS/Atom ingestion for tracked websites.
//!
//! feedwatch watches a set of websites, discovers their feeds, and persists
//! only the entries that are genuinely new relative to stored state. The
//! pipeline is: discover a site's feed URL once at onboarding, then on each
//! sync fetch and parse the feed, normalize its timestamps, decide newness
//! against the site's watermark and stored entries, and persist entries plus
//! the advanced watermark in one transaction.

pub mod config;
pub mod feed;
pub mod notify;
pub mod storage;
pub mod sync;
pub mod timestamp;
