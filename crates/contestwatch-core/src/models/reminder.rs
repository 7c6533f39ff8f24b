use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::datetime::parse_notification_time;

/// A scheduled contest reminder, persisted keyed by contest id.
///
/// `notification_time` is a naive wall-clock time in the display timezone,
/// formatted `YYYY-MM-DD HH:MM:SS`. Once `notified` is set it stays set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Reminder {
    pub id: String,
    #[serde(default = "default_event")]
    pub event: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    pub start_time: String,
    pub notification_time: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub notified: bool,
}

fn default_event() -> String {
    "Contest".to_string()
}

fn default_platform() -> String {
    "Unknown".to_string()
}

fn default_url() -> String {
    "#".to_string()
}

impl Reminder {
    pub fn notification_at(&self) -> Option<NaiveDateTime> {
        parse_notification_time(&self.notification_time)
    }

    /// Seconds from `now` until the notification is due; negative once overdue.
    pub fn seconds_until_notification(&self, now: NaiveDateTime) -> Option<i64> {
        self.notification_at().map(|at| (at - now).num_seconds())
    }

    pub fn notification_title(&self) -> String {
        format!("{} Contest Reminder", self.platform)
    }

    pub fn notification_body(&self) -> String {
        format!("{} starts at {}", self.event, self.start_time)
    }
}
