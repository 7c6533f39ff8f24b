use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{Contest, Reminder};
use crate::storage::{JsonFile, StorageError};
use crate::utils::datetime::{format_notification_time, parse_display_datetime};

/// Reminder file name in the data directory
pub const REMINDERS_FILE: &str = "contest_reminders.json";

/// Minutes before a contest starts that its reminder fires
pub const DEFAULT_LEAD_MINUTES: i64 = 30;

/// Contest id -> reminder, as persisted.
pub type ReminderMap = BTreeMap<String, Reminder>;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Cannot add reminder: contest id missing")]
    MissingId,

    #[error("Cannot add reminder: start time missing")]
    MissingStartTime,

    #[error("Cannot parse start time: {0}")]
    UnparseableStartTime(String),

    #[error("Failed to persist reminders: {0}")]
    Storage(#[from] StorageError),
}

/// Persisted map of reminders keyed by contest id.
///
/// Every mutation is a full read-modify-write of the file under the file's
/// lock. Failures are logged; the boolean API never returns an error.
pub struct ReminderStore {
    file: JsonFile<ReminderMap>,
    lead: Duration,
}

impl ReminderStore {
    /// A `lead_minutes` too large for a `Duration` uses [`DEFAULT_LEAD_MINUTES`].
    pub fn new(path: PathBuf, lead_minutes: i64) -> Self {
        Self {
            file: JsonFile::new(path),
            lead: Duration::try_minutes(lead_minutes)
                .unwrap_or_else(|| Duration::minutes(DEFAULT_LEAD_MINUTES)),
        }
    }

    /// Build the reminder for `contest` without storing it.
    pub fn reminder_for(&self, contest: &Contest) -> Result<Reminder, ReminderError> {
        let id = contest.id.trim();
        if id.is_empty() {
            return Err(ReminderError::MissingId);
        }

        let start_time = contest
            .start_datetime
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ReminderError::MissingStartTime)?;
        let start = parse_display_datetime(start_time)
            .ok_or_else(|| ReminderError::UnparseableStartTime(start_time.to_string()))?;

        Ok(Reminder {
            id: id.to_string(),
            event: if contest.event.is_empty() {
                "Contest".to_string()
            } else {
                contest.event.clone()
            },
            platform: if contest.platform_display_name.is_empty() {
                "Unknown".to_string()
            } else {
                contest.platform_display_name.clone()
            },
            start_time: start_time.to_string(),
            notification_time: format_notification_time(start - self.lead),
            url: if contest.href.is_empty() {
                "#".to_string()
            } else {
                contest.href.clone()
            },
            notified: false,
        })
    }

    /// Schedule (or reschedule) a reminder for `contest`.
    pub fn try_add(&self, contest: &Contest) -> Result<Reminder, ReminderError> {
        let reminder = self.reminder_for(contest)?;
        let stored = reminder.clone();
        self.file.update(|map| {
            map.insert(stored.id.clone(), stored);
        })?;

        info!(
            contest = %reminder.event,
            notification_time = %reminder.notification_time,
            "Reminder added"
        );
        Ok(reminder)
    }

    pub fn add(&self, contest: &Contest) -> bool {
        match self.try_add(contest) {
            Ok(_) => true,
            Err(e) => {
                error!(contest_id = %contest.id, error = %e, "Failed to add reminder");
                false
            }
        }
    }

    /// Delete the reminder for `contest_id`. False if there was none.
    pub fn remove(&self, contest_id: &str) -> bool {
        if !self.is_set(contest_id) {
            return false;
        }
        match self.file.update(|map| map.remove(contest_id).is_some()) {
            Ok(removed) => removed,
            Err(e) => {
                error!(contest_id = contest_id, error = %e, "Failed to remove reminder");
                false
            }
        }
    }

    pub fn is_set(&self, contest_id: &str) -> bool {
        self.load_all().contains_key(contest_id)
    }

    pub fn get(&self, contest_id: &str) -> Option<Reminder> {
        self.load_all().remove(contest_id)
    }

    /// Every stored reminder. An unreadable file reads as empty.
    pub fn load_all(&self) -> ReminderMap {
        match self.file.load() {
            Ok(map) => map,
            Err(e) => {
                error!(error = %e, "Error loading reminders");
                ReminderMap::new()
            }
        }
    }

    /// Persist one monitor pass: mark `notified` ids and drop `purged` ids in a
    /// single write. Ids removed by the user since the pass started stay removed.
    pub(crate) fn apply_pass(&self, notified: &[String], purged: &[String]) -> Result<(), StorageError> {
        self.file.update(|map| {
            for id in notified {
                if let Some(reminder) = map.get_mut(id) {
                    reminder.notified = true;
                }
            }
            for id in purged {
                map.remove(id);
            }
        })
    }
}
