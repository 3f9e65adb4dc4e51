//! Dose recorder: apply a take/skip action to the ledger and supply.
//!
//! Recording upserts the entry at its natural key, then decrements supply
//! exactly once per not-taken -> taken transition. One ledger persistence
//! and at most one medication persistence per call; a failure between the
//! two leaves the ledger written and the supply untouched, which is an
//! accepted limitation of the whole-collection write model.

use crate::store::KeyValueStore;
use crate::{ledger, registry, DoseHistoryEntry, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Record a dose action for (medication, scheduled time, `timestamp`'s day).
///
/// `scheduled_time` may be [`crate::AS_NEEDED`], in which case the day's
/// single as-needed slot is the one updated. Re-marking an already-taken
/// dose as taken is a no-op on supply; marking taken -> not-taken never
/// restores supply.
pub fn record_dose(
    store: &dyn KeyValueStore,
    medication_id: Uuid,
    scheduled_time: &str,
    taken: bool,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    let mut history = ledger::load_history(store)?;
    let day = timestamp.date_naive();

    let decrement = match ledger::find_entry_index(&history, medication_id, scheduled_time, day) {
        Some(idx) => {
            let entry = &mut history[idx];
            let fired = taken && !entry.taken;
            entry.taken = taken;
            entry.timestamp = timestamp;
            tracing::debug!(%medication_id, slot = %scheduled_time, taken, "updated dose entry");
            fired
        }
        None => {
            history.push(DoseHistoryEntry {
                id: Uuid::new_v4(),
                medication_id,
                scheduled_time: scheduled_time.to_string(),
                timestamp,
                taken,
            });
            tracing::debug!(%medication_id, slot = %scheduled_time, taken, "inserted dose entry");
            taken
        }
    };

    ledger::save_history(store, &mut history)?;

    if decrement {
        decrement_supply(store, medication_id)?;
    }
    Ok(())
}

/// Floor-clamped supply decrement.
///
/// A missing medication or an already-empty supply suppresses the
/// decrement (it is never queued); the history write above stands either
/// way.
fn decrement_supply(store: &dyn KeyValueStore, medication_id: Uuid) -> Result<()> {
    let mut medications = registry::load_medications(store)?;

    let Some(med) = medications.iter_mut().find(|m| m.id == medication_id) else {
        tracing::warn!(%medication_id, "medication not in registry, supply update skipped");
        return Ok(());
    };

    if med.current_supply == 0 {
        tracing::debug!(medication = %med.name, "supply already empty, decrement suppressed");
        return Ok(());
    }

    med.current_supply -= 1;
    if med.needs_refill() {
        tracing::info!(medication = %med.name, supply = med.current_supply, "refill threshold reached");
    }
    registry::save_medications(store, &medications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Medication, AS_NEEDED};
    use chrono::TimeZone;

    fn medication(supply: u32) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Test".into(),
            dosage: "1 tablet".into(),
            times: vec!["09:00".into()],
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            duration: "Ongoing".into(),
            current_supply: supply,
            total_supply: 30,
            refill_at: 2,
            refill_reminder: true,
            reminder_enabled: true,
            color: "#CC6600".into(),
            last_refill_date: None,
        }
    }

    fn at(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, min, 0).unwrap()
    }

    fn supply_of(store: &MemoryStore, id: Uuid) -> u32 {
        registry::find_medication(store, id)
            .unwrap()
            .unwrap()
            .current_supply
    }

    #[test]
    fn test_take_decrements_once() {
        let store = MemoryStore::new();
        let med = medication(1);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "09:00", true, at(10, 9, 5)).unwrap();
        assert_eq!(supply_of(&store, id), 0);

        // Re-marking the same slot taken is a no-op on supply
        record_dose(&store, id, "09:00", true, at(10, 9, 30)).unwrap();
        assert_eq!(supply_of(&store, id), 0);

        let history = ledger::load_history(&store).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, at(10, 9, 30));
        assert!(history[0].taken);
    }

    #[test]
    fn test_untake_never_restores_supply() {
        let store = MemoryStore::new();
        let med = medication(5);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "09:00", true, at(10, 9, 0)).unwrap();
        assert_eq!(supply_of(&store, id), 4);

        record_dose(&store, id, "09:00", false, at(10, 9, 10)).unwrap();
        assert_eq!(supply_of(&store, id), 4);

        // Taking again after an un-take fires the transition again
        record_dose(&store, id, "09:00", true, at(10, 9, 20)).unwrap();
        assert_eq!(supply_of(&store, id), 3);
    }

    #[test]
    fn test_skip_on_creation_does_not_decrement() {
        let store = MemoryStore::new();
        let med = medication(5);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "09:00", false, at(10, 9, 0)).unwrap();
        assert_eq!(supply_of(&store, id), 5);

        let history = ledger::load_history(&store).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].taken);
    }

    #[test]
    fn test_supply_floor_clamped_at_zero() {
        let store = MemoryStore::new();
        let med = medication(0);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "09:00", true, at(10, 9, 0)).unwrap();
        assert_eq!(supply_of(&store, id), 0);

        // The history write still lands
        assert_eq!(ledger::load_history(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_medication_is_history_only() {
        let store = MemoryStore::new();
        let ghost = Uuid::new_v4();

        record_dose(&store, ghost, "09:00", true, at(10, 9, 0)).unwrap();

        let history = ledger::load_history(&store).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].medication_id, ghost);
    }

    #[test]
    fn test_same_slot_different_days_are_distinct() {
        let store = MemoryStore::new();
        let med = medication(5);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "09:00", true, at(10, 9, 0)).unwrap();
        record_dose(&store, id, "09:00", true, at(11, 9, 0)).unwrap();

        assert_eq!(supply_of(&store, id), 3);
        assert_eq!(ledger::load_history(&store).unwrap().len(), 2);
    }

    #[test]
    fn test_as_needed_one_slot_per_day() {
        // The empty scheduled time is a natural key like any other, so a
        // second same-day as-needed recording updates the first entry.
        let store = MemoryStore::new();
        let mut med = medication(5);
        med.times.clear();
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, AS_NEEDED, true, at(10, 9, 0)).unwrap();
        record_dose(&store, id, AS_NEEDED, true, at(10, 15, 0)).unwrap();

        // Second call is a re-mark, not a second dose
        assert_eq!(supply_of(&store, id), 4);
        assert_eq!(ledger::load_history(&store).unwrap().len(), 1);

        // A new day gets a fresh slot
        record_dose(&store, id, AS_NEEDED, true, at(11, 9, 0)).unwrap();
        assert_eq!(supply_of(&store, id), 3);
        assert_eq!(ledger::load_history(&store).unwrap().len(), 2);
    }

    #[test]
    fn test_ledger_sorted_after_out_of_order_recording() {
        let store = MemoryStore::new();
        let med = medication(10);
        let id = med.id;
        registry::add_medication(&store, med).unwrap();

        record_dose(&store, id, "21:00", true, at(10, 21, 0)).unwrap();
        record_dose(&store, id, "09:00", true, at(10, 9, 0)).unwrap();
        record_dose(&store, id, "09:00", true, at(9, 9, 0)).unwrap();

        let history = ledger::load_history(&store).unwrap();
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
