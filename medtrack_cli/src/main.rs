use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use medtrack_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication dose tracking and adherence system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a medication to the registry
    Add {
        /// Medication name
        name: String,

        /// Dosage description, e.g. "200 mg"
        #[arg(long, default_value = "")]
        dosage: String,

        /// Scheduled dose time (HH:MM, 24h). Repeatable; omit for as-needed
        #[arg(long = "time")]
        times: Vec<String>,

        /// Start date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Course length, e.g. "7 days", or "Ongoing"
        #[arg(long, default_value = ONGOING)]
        duration: String,

        /// Current dose count on hand
        #[arg(long, default_value_t = 0)]
        supply: u32,

        /// Flag a refill once supply drops to this count
        #[arg(long, default_value_t = 0)]
        refill_at: u32,

        /// Enable the low-supply refill reminder
        #[arg(long)]
        refill_reminder: bool,

        /// Disable dose reminders for this medication
        #[arg(long)]
        no_reminders: bool,

        /// Display color (hex)
        #[arg(long, default_value = "#4A90D9")]
        color: String,
    },

    /// List medications with supply and refill status
    List,

    /// Show medications with a dose due right now
    Due,

    /// Record a dose as taken or skipped
    Record {
        /// Medication name or id
        medication: String,

        /// Scheduled slot (HH:MM); omit for an as-needed dose
        #[arg(long)]
        time: Option<String>,

        /// Record the dose as skipped instead of taken
        #[arg(long)]
        skip: bool,
    },

    /// Back-fill missed doses into the history ledger
    Sync,

    /// Show recent dose history
    History {
        /// How many days back to show
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Restrict to one medication (name or id)
        #[arg(long)]
        medication: Option<String>,
    },

    /// Reset a medication's supply to its refill total
    Refill {
        /// Medication name or id
        medication: String,
    },

    /// Remove a medication (dose history is kept)
    Remove {
        /// Medication name or id
        medication: String,
    },

    /// Export the full dose history to CSV
    Export {
        /// Output file path
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // Explicit one-shot process initialization
    medtrack_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = FileStore::new(&data_dir);
    let scheduler = LogScheduler;
    let now = Utc::now();

    match cli.command {
        Commands::Add {
            name,
            dosage,
            times,
            start_date,
            duration,
            supply,
            refill_at,
            refill_reminder,
            no_reminders,
            color,
        } => cmd_add(
            &store,
            &scheduler,
            now,
            AddArgs {
                name,
                dosage,
                times,
                start_date,
                duration,
                supply,
                refill_at,
                refill_reminder,
                reminder_enabled: !no_reminders && config.reminders.enabled_by_default,
                color,
            },
        ),
        Commands::List => cmd_list(&store, now),
        Commands::Due => cmd_due(&store, now),
        Commands::Record {
            medication,
            time,
            skip,
        } => cmd_record(&store, now, &medication, time.as_deref(), skip),
        Commands::Sync => cmd_sync(&store, now),
        Commands::History { days, medication } => {
            cmd_history(&store, now, days, medication.as_deref())
        }
        Commands::Refill { medication } => cmd_refill(&store, now, &medication),
        Commands::Remove { medication } => cmd_remove(&store, &scheduler, &medication),
        Commands::Export { out } => cmd_export(&store, &out),
    }
}

struct AddArgs {
    name: String,
    dosage: String,
    times: Vec<String>,
    start_date: Option<NaiveDate>,
    duration: String,
    supply: u32,
    refill_at: u32,
    refill_reminder: bool,
    reminder_enabled: bool,
    color: String,
}

fn cmd_add(
    store: &FileStore,
    scheduler: &dyn ReminderScheduler,
    now: DateTime<Utc>,
    args: AddArgs,
) -> Result<()> {
    // Reject malformed slots up front rather than skipping them later
    for slot in &args.times {
        parse_clock_time(slot)?;
    }

    let start = args.start_date.unwrap_or_else(|| now.date_naive());
    let medication = Medication {
        id: Uuid::new_v4(),
        name: args.name,
        dosage: args.dosage,
        times: args.times,
        start_date: start.and_time(chrono::NaiveTime::MIN).and_utc(),
        duration: args.duration,
        current_supply: args.supply,
        total_supply: args.supply,
        refill_at: args.refill_at,
        refill_reminder: args.refill_reminder,
        reminder_enabled: args.reminder_enabled,
        color: args.color,
        last_refill_date: None,
    };

    registry::add_medication(store, medication.clone())?;
    notify::resync_reminders(scheduler, &medication)?;

    let schedule = if medication.is_as_needed() {
        "as needed".to_string()
    } else {
        medication.times.join(", ")
    };
    println!("✓ Added {} ({})", medication.name, schedule);
    println!("  id: {}", medication.id);
    Ok(())
}

fn cmd_list(store: &FileStore, now: DateTime<Utc>) -> Result<()> {
    sync_missed_doses(store, now)?;

    let medications = registry::load_medications(store)?;
    if medications.is_empty() {
        println!("No medications registered.");
        return Ok(());
    }

    let today = now.date_naive();
    for med in &medications {
        let schedule = if med.is_as_needed() {
            "as needed".to_string()
        } else {
            med.times.join(", ")
        };
        let status = if !med.is_active_on(today) {
            "  [inactive]"
        } else if med.needs_refill() {
            "  [refill needed]"
        } else {
            ""
        };

        println!(
            "{}  {} — {} ({}), supply {}/{}{}",
            med.id, med.name, med.dosage, schedule, med.current_supply, med.total_supply, status
        );
    }
    Ok(())
}

fn cmd_due(store: &FileStore, now: DateTime<Utc>) -> Result<()> {
    sync_missed_doses(store, now)?;

    let medications = registry::load_medications(store)?;
    let history = ledger::load_history(store)?;
    let today = now.date_naive();

    let mut any = false;
    for med in &medications {
        if !med.is_active_on(today) || !med.is_due(today, now) {
            continue;
        }

        if med.is_as_needed() {
            any = true;
            println!("{} — {} (as needed)", med.name, med.dosage);
            continue;
        }

        // Show only slots that have elapsed and are not yet taken
        for slot in &med.times {
            let Ok(clock) = parse_clock_time(slot) else {
                continue;
            };
            if clock > now.time() {
                continue;
            }
            let taken = ledger::find_entry_index(&history, med.id, slot, today)
                .map(|idx| history[idx].taken)
                .unwrap_or(false);
            if !taken {
                any = true;
                println!("{} — {} at {}", med.name, med.dosage, slot);
            }
        }
    }

    if !any {
        println!("Nothing due right now.");
    }
    Ok(())
}

fn cmd_record(
    store: &FileStore,
    now: DateTime<Utc>,
    selector: &str,
    time: Option<&str>,
    skip: bool,
) -> Result<()> {
    let medication = resolve_medication(store, selector)?;

    let slot = match time {
        Some(t) => {
            parse_clock_time(t)?;
            t
        }
        None => AS_NEEDED,
    };

    record_dose(store, medication.id, slot, !skip, now)?;

    if skip {
        println!("Dose of {} recorded as skipped.", medication.name);
    } else {
        println!("✓ Dose of {} recorded as taken.", medication.name);
    }

    // Supply was mutated after our snapshot; reload for the refill check
    if let Some(current) = registry::find_medication(store, medication.id)? {
        if current.needs_refill() {
            println!(
                "⚠ Refill needed: {} doses left (threshold {}).",
                current.current_supply, current.refill_at
            );
        }
    }
    Ok(())
}

fn cmd_sync(store: &FileStore, now: DateTime<Utc>) -> Result<()> {
    let inserted = sync_missed_doses(store, now)?;
    if inserted == 0 {
        println!("History is up to date.");
    } else {
        println!("✓ Back-filled {} missed doses.", inserted);
    }
    Ok(())
}

fn cmd_history(
    store: &FileStore,
    now: DateTime<Utc>,
    days: i64,
    selector: Option<&str>,
) -> Result<()> {
    sync_missed_doses(store, now)?;

    let medications = registry::load_medications(store)?;
    let history = ledger::load_history(store)?;

    let filter_id = match selector {
        Some(s) => Some(resolve_medication(store, s)?.id),
        None => None,
    };

    let entries: Vec<_> = ledger::recent_entries(&history, days, now)
        .into_iter()
        .filter(|e| filter_id.map_or(true, |id| e.medication_id == id))
        .collect();

    if entries.is_empty() {
        println!("No dose history in the last {} days.", days);
        return Ok(());
    }

    for entry in &entries {
        let name = medications
            .iter()
            .find(|m| m.id == entry.medication_id)
            .map(|m| m.name.as_str())
            .unwrap_or("(removed)");
        let slot = if entry.scheduled_time.is_empty() {
            "as needed"
        } else {
            entry.scheduled_time.as_str()
        };
        let mark = if entry.taken { "✓ taken" } else { "✗ missed" };

        println!(
            "{}  {} ({})  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            name,
            slot,
            mark
        );
    }

    let (taken, missed) = ledger::adherence_counts(&entries);
    println!(
        "\n{} doses: {} taken, {} missed over the last {} days.",
        entries.len(),
        taken,
        missed,
        days
    );
    Ok(())
}

fn cmd_refill(store: &FileStore, now: DateTime<Utc>, selector: &str) -> Result<()> {
    let medication = resolve_medication(store, selector)?;
    let refilled = registry::refill_medication(store, medication.id, now)?;
    println!(
        "✓ Refilled {}: supply {}/{}.",
        refilled.name, refilled.current_supply, refilled.total_supply
    );
    Ok(())
}

fn cmd_remove(store: &FileStore, scheduler: &dyn ReminderScheduler, selector: &str) -> Result<()> {
    let medication = resolve_medication(store, selector)?;
    let removed = registry::remove_medication(store, medication.id)?;
    scheduler.cancel_for(removed.id)?;
    println!("✓ Removed {}. Dose history was kept.", removed.name);
    Ok(())
}

fn cmd_export(store: &FileStore, out: &std::path::Path) -> Result<()> {
    let rows = export_history_csv(store, out)?;
    println!("✓ Exported {} history rows to {}", rows, out.display());
    Ok(())
}

/// Resolve a medication by id or (case-insensitive) exact name
fn resolve_medication(store: &FileStore, selector: &str) -> Result<Medication> {
    let medications = registry::load_medications(store)?;

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(med) = medications.iter().find(|m| m.id == id) {
            return Ok(med.clone());
        }
    }

    let lower = selector.to_lowercase();
    let mut by_name = medications.iter().filter(|m| m.name.to_lowercase() == lower);
    match (by_name.next(), by_name.next()) {
        (Some(med), None) => Ok(med.clone()),
        (Some(_), Some(_)) => Err(Error::NotFound(format!(
            "medication name {:?} is ambiguous, use the id",
            selector
        ))),
        (None, _) => Err(Error::NotFound(format!("medication {:?}", selector))),
    }
}
