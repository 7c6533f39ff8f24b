use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default number of outbound requests allowed per window.
pub const DEFAULT_REQUESTS_PER_MINUTE: usize = 10;

/// Length of the sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window throttle for outbound API calls.
///
/// Keeps the timestamps of requests made within the trailing window. The
/// window lock is held while waiting, so concurrent acquirers queue up in
/// order instead of racing for the same slot.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            requests: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, DEFAULT_WINDOW)
    }

    /// Wait until a request slot is free, then claim it. Never fails.
    pub async fn acquire(&self) {
        let mut requests = self.requests.lock().await;

        let now = Instant::now();
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.max_requests {
            if let Some(&oldest) = requests.front() {
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
            requests.pop_front();
        }

        requests.push_back(Instant::now());
    }

    /// Number of requests currently counted against the window.
    pub async fn in_window(&self) -> usize {
        let requests = self.requests.lock().await;
        let now = Instant::now();
        requests
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(DEFAULT_REQUESTS_PER_MINUTE)
    }
}
