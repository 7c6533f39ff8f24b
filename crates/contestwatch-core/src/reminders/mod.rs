//! Contest reminders.
//!
//! This module provides:
//! - `ReminderStore`: reminders persisted as one JSON object keyed by contest id
//! - `ReminderMonitor`: the background loop that fires and purges reminders
//! - `NotificationSink`: the boundary to whatever actually shows notifications
//!
//! A reminder fires 30 minutes before its contest starts and is dropped two
//! hours after its notification time.

pub mod monitor;
pub mod notify;
pub mod store;

pub use monitor::{PassReport, ReminderMonitor, DEFAULT_POLL_INTERVAL, DEFAULT_PURGE_AFTER_SECS};
pub use notify::{LogNotifier, NotificationSink};
pub use store::{ReminderError, ReminderMap, ReminderStore, DEFAULT_LEAD_MINUTES, REMINDERS_FILE};
