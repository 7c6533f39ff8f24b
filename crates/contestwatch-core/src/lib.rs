//! Core library for contestwatch.
//!
//! This crate owns everything below the UI layer:
//!
//! - `cache`: two-tier (memory + disk) contest cache with TTL validity
//! - `api`: the upstream contest listing client and its rate limiter
//! - `fetch`: cache-or-fetch orchestration and the single-flight background sweep
//! - `reminders`: persisted reminders and the polling notification monitor
//! - `context`: the `AppContext` that wires all of the above together
//!
//! Front ends (the CLI, a GUI) construct one `AppContext` at startup and call
//! into it; nothing in this crate keeps process-global state.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod fetch;
pub mod models;
pub mod reminders;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, ContestQuery, ContestSource, RateLimiter};
pub use cache::{CacheEntry, ExpiringCache};
pub use config::Config;
pub use context::{AppContext, RefreshRequest};
pub use fetch::{BackgroundFetchCoordinator, ContestFetchOrchestrator, FetchOptions, SweepOutcome};
pub use models::{Contest, PlatformInfo, Reminder};
pub use reminders::{LogNotifier, NotificationSink, PassReport, ReminderMonitor, ReminderStore};
