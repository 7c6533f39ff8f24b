//! Local caching module for offline contest data access.
//!
//! This module provides the `ExpiringCache` for storing and retrieving
//! contest listings per platform. Each platform's list lives in memory and in
//! a JSON file `<platform>_contests.json`, and is considered valid for a
//! configurable duration after it was written.

pub mod manager;

pub use manager::{CacheEntry, CacheMetadata, ExpiringCache};
