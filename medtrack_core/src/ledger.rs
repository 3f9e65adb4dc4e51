//! Dose history ledger backed by the durable store.
//!
//! The ledger is the ordered collection of recorded dose events. It is
//! always persisted sorted by timestamp ascending; natural-key lookups and
//! history display both rely on that ordering being an invariant rather
//! than a courtesy.

use crate::store::{KeyValueStore, DOSE_HISTORY_KEY};
use crate::{DoseHistoryEntry, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Load the full dose history. An absent key is an empty ledger.
pub fn load_history(store: &dyn KeyValueStore) -> Result<Vec<DoseHistoryEntry>> {
    match store.get(DOSE_HISTORY_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

/// Sort the ledger by timestamp ascending and persist it in full
pub fn save_history(store: &dyn KeyValueStore, entries: &mut Vec<DoseHistoryEntry>) -> Result<()> {
    entries.sort_by_key(|e| e.timestamp);
    let raw = serde_json::to_string(entries)?;
    store.set(DOSE_HISTORY_KEY, &raw)?;
    tracing::debug!(entries = entries.len(), "persisted dose history");
    Ok(())
}

/// Find the entry occupying a natural key, if any.
///
/// The key is (medication, scheduled time, calendar day); at most one
/// entry exists per key, so the first match is the only match.
pub fn find_entry_index(
    entries: &[DoseHistoryEntry],
    medication_id: Uuid,
    scheduled_time: &str,
    day: chrono::NaiveDate,
) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.matches_key(medication_id, scheduled_time, day))
}

/// Entries for one medication, in ledger (timestamp) order
pub fn entries_for(entries: &[DoseHistoryEntry], medication_id: Uuid) -> Vec<&DoseHistoryEntry> {
    entries
        .iter()
        .filter(|e| e.medication_id == medication_id)
        .collect()
}

/// Entries whose timestamp falls within the last `days` days of `now`.
///
/// A day count too large to subtract from `now` means no cutoff at all:
/// the full ledger qualifies.
pub fn recent_entries(
    entries: &[DoseHistoryEntry],
    days: i64,
    now: DateTime<Utc>,
) -> Vec<&DoseHistoryEntry> {
    let cutoff = Duration::try_days(days).and_then(|d| now.checked_sub_signed(d));
    entries
        .iter()
        .filter(|e| cutoff.map_or(true, |c| e.timestamp >= c))
        .collect()
}

/// Taken/missed counts over a slice of entries
pub fn adherence_counts(entries: &[&DoseHistoryEntry]) -> (usize, usize) {
    let taken = entries.iter().filter(|e| e.taken).count();
    (taken, entries.len() - taken)
}
