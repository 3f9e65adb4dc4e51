//! Core domain types for the medication tracking system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medication definitions and their daily dose schedules
//! - Dose history entries (taken, skipped, and synthesized missed doses)
//! - Supply and refill bookkeeping

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduled-time value used for as-needed recordings.
///
/// As-needed medications carry no clock schedule, so their history entries
/// share one empty scheduled-time slot per day.
pub const AS_NEEDED: &str = "";

/// Duration sentinel for medications taken indefinitely.
///
/// Any duration text without a leading whole-day count parses as ongoing;
/// this is the canonical spelling.
pub const ONGOING: &str = "Ongoing";

// ============================================================================
// Medication
// ============================================================================

/// A medication definition with its daily schedule and supply state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    /// Free-text dosage description (e.g., "200 mg", "2 tablets")
    pub dosage: String,
    /// Daily scheduled clock-times as 24h "HH:MM" strings, in dose order.
    /// Empty means as-needed.
    pub times: Vec<String>,
    /// Only the calendar day is meaningful; time-of-day is ignored.
    pub start_date: DateTime<Utc>,
    /// Duration text, e.g. "7 days" or "Ongoing". The leading integer token
    /// is the day count; anything unparseable means ongoing.
    pub duration: String,
    pub current_supply: u32,
    /// Supply count as of the last refill
    pub total_supply: u32,
    /// Refill is flagged once `current_supply` drops to this count
    pub refill_at: u32,
    pub refill_reminder: bool,
    pub reminder_enabled: bool,
    /// Display color (hex string, presentation-only)
    pub color: String,
    pub last_refill_date: Option<DateTime<Utc>>,
}

impl Medication {
    /// Whether this medication has no clock schedule (taken as needed)
    pub fn is_as_needed(&self) -> bool {
        self.times.is_empty()
    }

    /// Derived refill indicator, never stored.
    ///
    /// Recomputed on demand so it is always consistent with the latest
    /// supply mutation.
    pub fn needs_refill(&self) -> bool {
        self.refill_reminder && self.current_supply <= self.refill_at
    }

    /// Reset supply to the last-refill total and stamp the refill date
    pub fn refill(&mut self, now: DateTime<Utc>) {
        self.current_supply = self.total_supply;
        self.last_refill_date = Some(now);
    }
}

// ============================================================================
// Dose History
// ============================================================================

/// A recorded dose event.
///
/// One entry exists per (medication, scheduled time, calendar day); that
/// triple is the entry's natural key. `taken = false` entries are either
/// explicit skips or missed doses synthesized by reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DoseHistoryEntry {
    pub id: Uuid,
    /// May reference a formerly-existing medication; history outlives removal
    pub medication_id: Uuid,
    /// The "HH:MM" slot this entry fills, or [`AS_NEEDED`]
    pub scheduled_time: String,
    /// Actual recording instant for a taken/skipped action, or the
    /// synthesized scheduled instant for a missed dose
    pub timestamp: DateTime<Utc>,
    pub taken: bool,
}

impl DoseHistoryEntry {
    /// Whether this entry occupies the given natural key
    pub fn matches_key(&self, medication_id: Uuid, scheduled_time: &str, day: NaiveDate) -> bool {
        self.medication_id == medication_id
            && self.scheduled_time == scheduled_time
            && self.timestamp.date_naive() == day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_medication() -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Amoxicillin".into(),
            dosage: "500 mg".into(),
            times: vec!["09:00".into(), "21:00".into()],
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            duration: "7 days".into(),
            current_supply: 14,
            total_supply: 14,
            refill_at: 4,
            refill_reminder: true,
            reminder_enabled: true,
            color: "#4A90D9".into(),
            last_refill_date: None,
        }
    }

    #[test]
    fn test_needs_refill_derivation() {
        let mut med = test_medication();
        assert!(!med.needs_refill());

        med.current_supply = 4;
        assert!(med.needs_refill());

        med.current_supply = 0;
        assert!(med.needs_refill());

        // Derivation is gated on the reminder flag
        med.refill_reminder = false;
        assert!(!med.needs_refill());
    }

    #[test]
    fn test_refill_resets_supply_and_stamps_date() {
        let mut med = test_medication();
        med.current_supply = 2;

        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        med.refill(now);

        assert_eq!(med.current_supply, 14);
        assert_eq!(med.last_refill_date, Some(now));
    }

    #[test]
    fn test_natural_key_match() {
        let med_id = Uuid::new_v4();
        let entry = DoseHistoryEntry {
            id: Uuid::new_v4(),
            medication_id: med_id,
            scheduled_time: "09:00".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap(),
            taken: false,
        };

        let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(entry.matches_key(med_id, "09:00", day));
        // Different slot, different day, different medication all miss
        assert!(!entry.matches_key(med_id, "21:00", day));
        assert!(!entry.matches_key(med_id, "09:00", day.succ_opt().unwrap()));
        assert!(!entry.matches_key(Uuid::new_v4(), "09:00", day));
    }

    #[test]
    fn test_entry_roundtrip_serialization() {
        let entry = DoseHistoryEntry {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            scheduled_time: AS_NEEDED.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 2, 14, 30, 0).unwrap(),
            taken: true,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DoseHistoryEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, entry.id);
        assert_eq!(parsed.timestamp, entry.timestamp);
        assert_eq!(parsed.scheduled_time, AS_NEEDED);
        assert!(parsed.taken);
    }
}
