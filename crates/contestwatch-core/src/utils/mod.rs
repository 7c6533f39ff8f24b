//! Utility functions for timestamps and display formatting.

pub mod datetime;
pub mod format;

// Re-export commonly used functions at module level
pub use datetime::{format_display, normalize_timestamp, now_in_display_tz, parse_display_datetime};
pub use format::{format_age, format_countdown, truncate_string, Urgency};
