use tracing::info;

/// Something that can show a notification to the user.
///
/// Returning `true` means the sink accepted the notification. Whether that
/// means "displayed" or only "queued" is up to the sink; the monitor treats
/// it as delivered either way and will not send it again.
pub trait NotificationSink: Send + Sync {
    fn send(&self, title: &str, text: &str) -> bool;
}

/// Sink that writes notifications to the log. Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn send(&self, title: &str, text: &str) -> bool {
        info!(title = title, text = text, "Notification");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_always_succeeds() {
        let sink: &dyn NotificationSink = &LogNotifier;
        assert!(sink.send("CodeChef Contest Reminder", "Starters 170 starts at 2025-01-01 08:00 PM IST"));
    }
}
