/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Human-readable age for a number of elapsed minutes ("just now", "5m ago", "2h ago", "3d ago")
pub fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Negative ages come from clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// How close a reminder is to firing, for colouring countdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Notification time reached or passed
    Due,
    /// Within the next hour
    Soon,
    Later,
}

impl Urgency {
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            Urgency::Due
        } else if seconds <= 3600 {
            Urgency::Soon
        } else {
            Urgency::Later
        }
    }
}

/// Format the seconds remaining until a reminder fires
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        return "Notification time!".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else {
        format!("{}m {}s", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(-3), "just now");
        assert_eq!(format_age(0), "just now");
        assert_eq!(format_age(5), "5m ago");
        assert_eq!(format_age(89), "1h ago");
        assert_eq!(format_age(90), "2h ago");
        assert_eq!(format_age(1440 + 11 * 60), "1d ago");
        assert_eq!(format_age(1440 + 12 * 60), "2d ago");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "Notification time!");
        assert_eq!(format_countdown(-30), "Notification time!");
        assert_eq!(format_countdown(65), "1m 5s");
        assert_eq!(format_countdown(3 * 3600 + 4 * 60 + 5), "3h 4m 5s");
        assert_eq!(format_countdown(2 * 86_400 + 3600 + 60), "2d 1h 1m");
    }

    #[test]
    fn test_urgency_levels() {
        assert_eq!(Urgency::from_seconds(-1), Urgency::Due);
        assert_eq!(Urgency::from_seconds(0), Urgency::Due);
        assert_eq!(Urgency::from_seconds(3600), Urgency::Soon);
        assert_eq!(Urgency::from_seconds(3601), Urgency::Later);
    }
}
