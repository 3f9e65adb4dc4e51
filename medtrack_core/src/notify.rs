//! Reminder scheduling interface.
//!
//! Delivery of alerts is a platform collaborator concern; the engine only
//! needs schedule-by-time-of-day and cancel-by-tag, where the tag is the
//! medication id. Registry mutations call [`resync_reminders`] so the
//! scheduled alerts always track the current definition.

use crate::{Medication, Result};
use uuid::Uuid;

/// Scheduler seam consumed by the engine
pub trait ReminderScheduler {
    /// Schedule one recurring alert per scheduled clock-time
    fn schedule_dose_reminders(&self, medication: &Medication) -> Result<()>;

    /// Schedule an immediate low-supply alert
    fn schedule_refill_alert(&self, medication: &Medication) -> Result<()>;

    /// Cancel every alert tagged with this medication id
    fn cancel_for(&self, medication_id: Uuid) -> Result<()>;
}

/// Cancel-then-reschedule for one medication after a registry mutation
pub fn resync_reminders(
    scheduler: &dyn ReminderScheduler,
    medication: &Medication,
) -> Result<()> {
    scheduler.cancel_for(medication.id)?;
    if medication.reminder_enabled && !medication.is_as_needed() {
        scheduler.schedule_dose_reminders(medication)?;
    }
    if medication.needs_refill() {
        scheduler.schedule_refill_alert(medication)?;
    }
    Ok(())
}

/// Tracing-only scheduler used by the CLI, where no delivery surface exists
pub struct LogScheduler;

impl ReminderScheduler for LogScheduler {
    fn schedule_dose_reminders(&self, medication: &Medication) -> Result<()> {
        for slot in &medication.times {
            tracing::info!(medication = %medication.name, %slot, "would schedule daily reminder");
        }
        Ok(())
    }

    fn schedule_refill_alert(&self, medication: &Medication) -> Result<()> {
        tracing::info!(
            medication = %medication.name,
            supply = medication.current_supply,
            "would raise refill alert"
        );
        Ok(())
    }

    fn cancel_for(&self, medication_id: Uuid) -> Result<()> {
        tracing::debug!(%medication_id, "would cancel reminders");
        Ok(())
    }
}
