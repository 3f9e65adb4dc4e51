//! Reconciliation engine: back-fill missed doses into the ledger.
//!
//! Guarantees the ledger holds an explicit entry for every scheduled dose
//! instant that has already elapsed, for every medication, even across
//! days the app was never opened. Safe to call arbitrarily often: a pass
//! that finds nothing missing performs no write at all.

use crate::schedule::{duration_days, parse_clock_time};
use crate::store::KeyValueStore;
use crate::{ledger, registry, DoseHistoryEntry, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Insert a missed entry for every elapsed scheduled instant not yet in
/// the ledger. Returns how many entries were inserted.
///
/// As-needed medications (no scheduled times) are never auto-missed. The
/// scan covers each medication's active window, capped at today, so the
/// pass terminates in O(active days x scheduled times) regardless of how
/// long the app was away. Synthesized entries carry the scheduled instant
/// itself as their timestamp, not the time of the pass.
pub fn sync_missed_doses(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<usize> {
    let medications = registry::load_medications(store)?;
    let mut history = ledger::load_history(store)?;
    let today = now.date_naive();

    let mut inserted = 0usize;
    for med in &medications {
        if med.is_as_needed() {
            continue;
        }

        let start = med.start_date.date_naive();
        if start > today {
            continue;
        }

        // Window length: the parsed duration, or elapsed days for ongoing
        // courses; never past today either way.
        let elapsed = (today - start).num_days() + 1;
        let span = match duration_days(&med.duration) {
            Some(days) => days.min(elapsed),
            None => elapsed,
        };

        for offset in 0..span {
            let day = start + Duration::days(offset);
            for slot in &med.times {
                let clock = match parse_clock_time(slot) {
                    Ok(clock) => clock,
                    Err(e) => {
                        tracing::warn!(medication = %med.name, %slot, "skipping malformed scheduled time: {}", e);
                        continue;
                    }
                };

                let scheduled_at = day.and_time(clock).and_utc();
                if scheduled_at > now {
                    continue;
                }
                if ledger::find_entry_index(&history, med.id, slot, day).is_some() {
                    continue;
                }

                history.push(DoseHistoryEntry {
                    id: Uuid::new_v4(),
                    medication_id: med.id,
                    scheduled_time: slot.clone(),
                    timestamp: scheduled_at,
                    taken: false,
                });
                inserted += 1;
            }
        }
    }

    if inserted > 0 {
        tracing::info!(inserted, "back-filled missed doses");
        ledger::save_history(store, &mut history)?;
    }
    Ok(inserted)
}
