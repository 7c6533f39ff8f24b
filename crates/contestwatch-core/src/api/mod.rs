//! Upstream contest listing API.
//!
//! This module provides the `ApiClient` for the contest listing service, the
//! `ContestSource` trait the fetch layer depends on, and the `RateLimiter`
//! that bounds outbound calls.
//!
//! The service authenticates with an `Authorization: ApiKey <user:key>` header.

pub mod client;
pub mod error;
pub mod rate_limit;

use async_trait::async_trait;

pub use client::ApiClient;
pub use error::ApiError;
pub use rate_limit::RateLimiter;

use crate::models::RawContest;

/// One page of upcoming contests for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestQuery {
    /// Platform domain, sent as `resource`
    pub resource: String,
    pub limit: u32,
    pub offset: u32,
}

impl ContestQuery {
    pub fn params(&self) -> [(&'static str, String); 4] {
        [
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("upcoming", "true".to_string()),
            ("resource", self.resource.clone()),
        ]
    }
}

/// Anything that can list upcoming contests for a platform.
///
/// A single call is a single attempt; callers own retries.
#[async_trait]
pub trait ContestSource: Send + Sync {
    async fn fetch_contests(&self, query: &ContestQuery) -> Result<Vec<RawContest>, ApiError>;
}
