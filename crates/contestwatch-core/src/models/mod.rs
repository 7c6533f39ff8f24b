//! Data models for contest listings and reminders.
//!
//! - `RawContest`, `ContestsResponse`: upstream API records
//! - `Contest`: normalized, cached contest
//! - `Reminder`: persisted reminder keyed by contest id
//! - `platform`: the static registry of supported platforms

pub mod contest;
pub mod platform;
pub mod reminder;

pub use contest::{Contest, ContestsResponse, RawContest, RawId};
pub use platform::PlatformInfo;
pub use reminder::Reminder;
