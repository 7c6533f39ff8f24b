//! Timestamp parsing and the fixed display timezone (UTC+05:30, labelled IST).
//!
//! Upstream timestamps arrive as ISO-8601, with or without an offset. They are
//! rendered once, at normalization time, into the display form
//! `YYYY-MM-DD hh:mm AM IST`, and that string is what gets cached and shown.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use tracing::warn;

/// Seconds east of UTC for the display timezone.
const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Label appended to display timestamps.
pub const DISPLAY_TZ_LABEL: &str = "IST";

/// Display format without the timezone label.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Format of a reminder's `notification_time` (naive wall clock in the display timezone).
pub const NOTIFICATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset-less source formats. Naive timestamps are taken to be UTC.
const NAIVE_SOURCE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse an upstream ISO-8601 timestamp into an instant.
pub fn parse_source_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_SOURCE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Render an instant in the display timezone, e.g. `2025-01-01 10:00 AM IST`.
pub fn format_display(dt: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        dt.with_timezone(&display_offset()).format(DISPLAY_FORMAT),
        DISPLAY_TZ_LABEL
    )
}

/// Convert an upstream timestamp straight to its display form.
/// Unparseable input is logged and yields `None`; the record is later dropped.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    match parse_source_datetime(raw) {
        Some(dt) => Some(format_display(dt)),
        None => {
            warn!(timestamp = raw, "Unable to parse contest timestamp");
            None
        }
    }
}

/// Parse a display timestamp back into its naive wall-clock value.
pub fn parse_display_datetime(display: &str) -> Option<NaiveDateTime> {
    let wall_clock = display
        .split(&format!(" {}", DISPLAY_TZ_LABEL))
        .next()
        .unwrap_or(display)
        .trim();
    NaiveDateTime::parse_from_str(wall_clock, DISPLAY_FORMAT).ok()
}

pub fn parse_notification_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), NOTIFICATION_FORMAT).ok()
}

pub fn format_notification_time(value: NaiveDateTime) -> String {
    value.format(NOTIFICATION_FORMAT).to_string()
}

/// Current wall-clock time in the display timezone.
pub fn now_in_display_tz() -> NaiveDateTime {
    Utc::now().with_timezone(&display_offset()).naive_local()
}
