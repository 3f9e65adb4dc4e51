#![forbid(unsafe_code)]

//! Core domain model and business logic for the medtrack system.
//!
//! This crate provides:
//! - Domain types (medications, dose history entries)
//! - Calendar and clock-time schedule mathematics
//! - Durable key-value persistence (medication registry, dose history ledger)
//! - Missed-dose reconciliation
//! - Dose recording with supply tracking
//! - Reminder scheduling interfaces and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod store;
pub mod registry;
pub mod ledger;
pub mod reconcile;
pub mod recorder;
pub mod notify;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use schedule::{duration_days, parse_clock_time};
pub use reconcile::sync_missed_doses;
pub use recorder::record_dose;
pub use notify::{LogScheduler, ReminderScheduler};
pub use export::export_history_csv;
