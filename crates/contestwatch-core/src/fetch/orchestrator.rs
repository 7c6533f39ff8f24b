//! Cache-or-fetch orchestration for contest listings.
//!
//! Every platform is handled independently: a failure on one platform falls
//! back to that platform's cached data (however stale) and never aborts the
//! rest of the batch. The merged result only contains contests with a start
//! time, ordered by start.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{ApiError, ContestQuery, ContestSource, RateLimiter};
use crate::cache::ExpiringCache;
use crate::models::{platform, Contest, RawContest};

/// Attempts per platform before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base of the exponential backoff: waits are base, 2*base, 4*base, ...
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Contests requested per platform when the caller does not say.
pub const DEFAULT_LIMIT: u32 = 5;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{platform} unavailable after {attempts} attempt(s): {source}")]
    UpstreamUnavailable {
        platform: String,
        attempts: u32,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait after the failed attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

/// What to fetch and how hard to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Platform domains; `None` means every supported platform
    pub platforms: Option<Vec<String>>,
    pub limit: u32,
    pub offset: u32,
    /// Never touch the network; return whatever is cached, even if expired
    pub use_cache_only: bool,
    /// Ignore valid cache entries and go to the network
    pub force_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            platforms: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            use_cache_only: false,
            force_refresh: false,
        }
    }
}

impl FetchOptions {
    pub fn for_platforms(platforms: Vec<String>) -> Self {
        Self {
            platforms: Some(platforms),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn cache_only(mut self) -> Self {
        self.use_cache_only = true;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// Where one platform's contests came from.
enum Served {
    Cached,
    Fetched,
    Fallback,
}

/// Merged contests plus the per-platform fate of one `refresh` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub contests: Vec<Contest>,
    /// Platforms whose upstream fetch succeeded and were re-cached
    pub fetched: Vec<String>,
    /// Platforms whose fetch failed; their (possibly stale) cache was served
    pub failed: Vec<String>,
}

pub struct ContestFetchOrchestrator {
    cache: Arc<ExpiringCache>,
    limiter: Arc<RateLimiter>,
    source: Arc<dyn ContestSource>,
    retry: RetryPolicy,
}

impl ContestFetchOrchestrator {
    pub fn new(
        cache: Arc<ExpiringCache>,
        limiter: Arc<RateLimiter>,
        source: Arc<dyn ContestSource>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            limiter,
            source,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<ExpiringCache> {
        &self.cache
    }

    /// Upcoming contests across the requested platforms, sorted by start time.
    ///
    /// Never fails: if every platform fails and nothing is cached, the result
    /// is simply empty.
    pub async fn get_upcoming_contests(&self, options: &FetchOptions) -> Vec<Contest> {
        self.refresh(options).await.contests
    }

    /// Same as `get_upcoming_contests`, but also reports which platforms were
    /// fetched from upstream and which fell back to the cache after failing.
    pub async fn refresh(&self, options: &FetchOptions) -> RefreshReport {
        let platforms = platform::filter_supported(options.platforms.as_deref());

        let mut report = RefreshReport::default();
        for platform in &platforms {
            let (contests, served) = self.contests_for_platform(platform, options).await;
            match served {
                Served::Fetched => report.fetched.push(platform.clone()),
                Served::Fallback => report.failed.push(platform.clone()),
                Served::Cached => {}
            }
            report.contests.extend(contests);
        }

        report.contests.retain(Contest::has_start);
        report.contests.sort_by(Contest::cmp_by_start);
        report
    }

    async fn contests_for_platform(&self, platform: &str, options: &FetchOptions) -> (Vec<Contest>, Served) {
        if !options.force_refresh {
            if let Some(cached) = self.cache.get(platform) {
                info!(platform = platform, "Using cached data");
                return (cached, Served::Cached);
            }
        }

        if options.use_cache_only {
            info!(platform = platform, "Skipping API call (cache-only mode)");
            return (self.cache.get_stale(platform).unwrap_or_default(), Served::Cached);
        }

        match self.fetch_platform(platform, options).await {
            Ok(contests) => {
                self.cache.put(platform, contests.clone());
                (contests, Served::Fetched)
            }
            Err(e) => {
                error!(platform = platform, error = %e, "Fetch failed, falling back to cached data");
                (self.cache.get_stale(platform).unwrap_or_default(), Served::Fallback)
            }
        }
    }

    async fn fetch_platform(&self, platform: &str, options: &FetchOptions) -> Result<Vec<Contest>, FetchError> {
        self.limiter.acquire().await;

        info!(platform = platform, "Fetching fresh data");
        let query = ContestQuery {
            resource: platform.to_string(),
            limit: options.limit,
            offset: options.offset,
        };

        let raw = self.fetch_with_retry(&query).await?;
        Ok(raw
            .into_iter()
            .map(|record| Contest::from_raw(record, platform))
            .collect())
    }

    async fn fetch_with_retry(&self, query: &ContestQuery) -> Result<Vec<RawContest>, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.source.fetch_contests(query).await {
                Ok(records) => return Ok(records),
                Err(e) if attempt + 1 < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        platform = %query.resource,
                        retry = attempt + 1,
                        max_attempts = max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::UpstreamUnavailable {
                        platform: query.resource.clone(),
                        attempts: attempt + 1,
                        source: e,
                    })
                }
            }
        }
    }
}
