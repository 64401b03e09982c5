//! Deduplication: deciding which fetched candidates are genuinely new.
//!
//! An entry is new iff no stored entry shares its `(website, title)`
//! identity. The month-scoped path applies this as an all-or-nothing
//! precondition on the whole batch: one pre-existing title discards the
//! entire batch. That is deliberately faithful to the system this crate
//! replaces — see `test_single_existing_title_discards_whole_batch`.

use crate::feed::fetcher::MonthCandidates;
use crate::storage::{Database, NewEntry, StorageError};
use chrono::NaiveDateTime;

/// Entries accepted for persistence, plus the watermark the sync should
/// advance to (the first raw feed item's timestamp, regardless of mode).
#[derive(Debug)]
pub struct SyncBatch {
    pub entries: Vec<NewEntry>,
    pub watermark: NaiveDateTime,
}

/// Month-scoped dedup: accept the batch only if *none* of its titles
/// pre-exist for this website.
///
/// Returns `Ok(None)` when any candidate already exists — the whole batch is
/// discarded, conservative by design.
pub async fn dedupe_month_batch(
    db: &Database,
    batch: MonthCandidates,
) -> Result<Option<SyncBatch>, StorageError> {
    for candidate in &batch.candidates {
        if db
            .find_entry(candidate.website_id, &candidate.title)
            .await?
            .is_some()
        {
            tracing::debug!(
                title = %candidate.title,
                "Candidate already stored, discarding batch"
            );
            return Ok(None);
        }
    }

    Ok(Some(SyncBatch {
        entries: batch.candidates,
        watermark: batch.watermark,
    }))
}

/// Latest-N dedup: no per-entry existence checks. All candidates pass
/// through for duplicate-safe persistence (the store's uniqueness
/// constraint silently drops collisions).
///
/// Returns `None` for an empty candidate list — there is no item 0 to take
/// a watermark from.
pub fn accept_latest_batch(candidates: Vec<NewEntry>) -> Option<SyncBatch> {
    let watermark = candidates.first()?.published;
    Some(SyncBatch {
        entries: candidates,
        watermark,
    })
}
