//! Medication registry backed by the durable store.
//!
//! The registry is an in-memory view of the medications collection. Every
//! mutation reloads the full collection, edits it, and persists it back;
//! no caller holds a stale copy across operations.

use crate::store::{KeyValueStore, MEDICATIONS_KEY};
use crate::{Error, Medication, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Load the full medication collection. An absent key is an empty registry.
pub fn load_medications(store: &dyn KeyValueStore) -> Result<Vec<Medication>> {
    match store.get(MEDICATIONS_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

/// Persist the full medication collection
pub fn save_medications(store: &dyn KeyValueStore, medications: &[Medication]) -> Result<()> {
    let raw = serde_json::to_string(medications)?;
    store.set(MEDICATIONS_KEY, &raw)
}

/// Look up a single medication by id
pub fn find_medication(store: &dyn KeyValueStore, id: Uuid) -> Result<Option<Medication>> {
    Ok(load_medications(store)?.into_iter().find(|m| m.id == id))
}

/// Add a new medication to the registry
pub fn add_medication(store: &dyn KeyValueStore, medication: Medication) -> Result<()> {
    let mut medications = load_medications(store)?;
    tracing::info!(medication = %medication.name, id = %medication.id, "adding medication");
    medications.push(medication);
    save_medications(store, &medications)
}

/// Replace an existing medication in place, matched by id
pub fn update_medication(store: &dyn KeyValueStore, medication: &Medication) -> Result<()> {
    let mut medications = load_medications(store)?;
    let slot = medications
        .iter_mut()
        .find(|m| m.id == medication.id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", medication.id)))?;
    *slot = medication.clone();
    save_medications(store, &medications)
}

/// Remove a medication from the registry.
///
/// Dose history referencing the removed id is left intact; history
/// outlives the medications it records.
pub fn remove_medication(store: &dyn KeyValueStore, id: Uuid) -> Result<Medication> {
    let mut medications = load_medications(store)?;
    let idx = medications
        .iter()
        .position(|m| m.id == id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", id)))?;
    let removed = medications.remove(idx);
    tracing::info!(medication = %removed.name, %id, "removed medication");
    save_medications(store, &medications)?;
    Ok(removed)
}

/// Reset a medication's supply to its refill total and stamp the date
pub fn refill_medication(
    store: &dyn KeyValueStore,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Medication> {
    let mut medications = load_medications(store)?;
    let med = medications
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", id)))?;
    med.refill(now);
    let refilled = med.clone();
    save_medications(store, &medications)?;
    tracing::info!(medication = %refilled.name, supply = refilled.current_supply, "refilled");
    Ok(refilled)
}
