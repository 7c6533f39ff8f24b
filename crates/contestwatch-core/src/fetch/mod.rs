//! Contest fetching: the per-platform cache-or-fetch orchestrator and the
//! single-flight background sweep built on top of it.

pub mod background;
pub mod orchestrator;

pub use background::{BackgroundFetchCoordinator, SweepOutcome, BACKGROUND_FETCH_LIMIT};
pub use orchestrator::{ContestFetchOrchestrator, FetchError, FetchOptions, RefreshReport, RetryPolicy};
