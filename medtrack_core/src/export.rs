//! CSV export of the dose history ledger.
//!
//! Writes the full ledger joined with medication names, for sharing
//! adherence data with a clinician or another system.

use crate::store::KeyValueStore;
use crate::{ledger, registry, Result};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    medication_id: String,
    medication_name: String,
    scheduled_time: String,
    timestamp: String,
    taken: bool,
}

/// Export the full dose history to a CSV file.
///
/// Entries for medications no longer in the registry are kept and labeled
/// `(removed)`. Returns the number of rows written.
pub fn export_history_csv(store: &dyn KeyValueStore, path: &Path) -> Result<usize> {
    let medications = registry::load_medications(store)?;
    let history = ledger::load_history(store)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for entry in &history {
        let name = medications
            .iter()
            .find(|m| m.id == entry.medication_id)
            .map(|m| m.name.as_str())
            .unwrap_or("(removed)");

        writer.serialize(CsvRow {
            id: entry.id.to_string(),
            medication_id: entry.medication_id.to_string(),
            medication_name: name.to_string(),
            scheduled_time: entry.scheduled_time.clone(),
            timestamp: entry.timestamp.to_rfc3339(),
            taken: entry.taken,
        })?;
    }
    writer.flush()?;

    tracing::info!(rows = history.len(), path = %path.display(), "exported dose history");
    Ok(history.len())
}
