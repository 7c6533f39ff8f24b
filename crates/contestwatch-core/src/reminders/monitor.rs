//! Polling loop that fires due reminders and purges stale ones.
//!
//! Each pass loads every reminder and compares its notification time with the
//! current wall clock in the display timezone:
//!
//! - more than the purge window overdue: removed, notified or not
//! - due and not yet notified: sent; marked notified only if the sink succeeds
//! - otherwise: left alone
//!
//! Changes from one pass are written back in a single store update. A failed
//! send is retried on the next tick.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{NotificationSink, ReminderStore};
use crate::utils::datetime::now_in_display_tz;

/// Time between passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Seconds past the notification time after which a reminder is dropped
pub const DEFAULT_PURGE_AFTER_SECS: i64 = 2 * 60 * 60;

/// What one pass did, by contest id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub notified: Vec<String>,
    pub failed: Vec<String>,
    pub purged: Vec<String>,
}

pub struct ReminderMonitor {
    store: Arc<ReminderStore>,
    sink: Arc<dyn NotificationSink>,
    poll_interval: Duration,
    purge_after_secs: i64,
    task: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl ReminderMonitor {
    /// Must be called from within a Tokio runtime; the loop runs on that runtime.
    pub fn new(
        store: Arc<ReminderStore>,
        sink: Arc<dyn NotificationSink>,
        poll_interval: Duration,
        purge_after_secs: i64,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("ReminderMonitor must be created inside a Tokio runtime")?;
        Ok(Self {
            store,
            sink,
            poll_interval,
            purge_after_secs,
            task: Mutex::new(None),
            runtime,
        })
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start the polling loop unless it is already alive.
    /// Returns whether a new loop was started by this call.
    pub fn ensure_running(self: &Arc<Self>) -> bool {
        let mut task = self.task();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let monitor = Arc::clone(self);
        *task = Some(self.runtime.spawn(async move { monitor.run().await }));
        info!(poll_secs = self.poll_interval.as_secs(), "Reminder monitor started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // A pass reads and writes the reminder file and calls the sink
            let monitor = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || monitor.run_pass()).await {
                error!(error = %e, "Reminder pass failed");
            }
        }
    }

    pub fn run_pass(&self) -> PassReport {
        self.run_pass_at(now_in_display_tz())
    }

    /// One pass against an explicit "now" (display-timezone wall clock).
    pub fn run_pass_at(&self, now: NaiveDateTime) -> PassReport {
        let reminders = self.store.load_all();
        debug!(count = reminders.len(), now = %now, "Checking reminders");

        let mut report = PassReport::default();
        for (id, reminder) in &reminders {
            let Some(time_diff) = reminder.seconds_until_notification(now) else {
                warn!(
                    contest_id = %id,
                    notification_time = %reminder.notification_time,
                    "Unparseable notification time, removing reminder"
                );
                report.purged.push(id.clone());
                continue;
            };

            if time_diff < -self.purge_after_secs {
                info!(contest = %reminder.event, "Removing old reminder");
                report.purged.push(id.clone());
                continue;
            }

            if reminder.notified || time_diff > 0 {
                continue;
            }

            info!(contest = %reminder.event, "Countdown reached zero, sending notification");
            if self
                .sink
                .send(&reminder.notification_title(), &reminder.notification_body())
            {
                report.notified.push(id.clone());
            } else {
                warn!(contest = %reminder.event, "Failed to send notification, will retry");
                report.failed.push(id.clone());
            }
        }

        if !report.notified.is_empty() || !report.purged.is_empty() {
            match self.store.apply_pass(&report.notified, &report.purged) {
                Ok(()) => debug!(
                    notified = report.notified.len(),
                    purged = report.purged.len(),
                    "Reminder statuses saved"
                ),
                Err(e) => error!(error = %e, "Failed to save reminder statuses"),
            }
        }

        report
    }
}
