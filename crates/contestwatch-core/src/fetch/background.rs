//! Single-flight background refresh of contest data.
//!
//! `start` never blocks: it either launches a sweep on the Tokio runtime or,
//! if one is already running, reports `SweepOutcome::Rejected`. In both cases
//! `on_complete` is called exactly once, on the runtime rather than the
//! caller's thread. UI callers must hop back to their own thread themselves.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use super::{ContestFetchOrchestrator, FetchOptions};
use crate::models::platform;

/// Contests requested per platform by background sweeps.
pub const BACKGROUND_FETCH_LIMIT: u32 = 10;

/// How a call to `BackgroundFetchCoordinator::start` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// These platforms were fetched from upstream and re-cached
    Refreshed(Vec<String>),
    /// Every fetch attempted failed; callers got whatever was cached
    Unavailable(Vec<String>),
    /// Every requested platform still had valid cached data
    UpToDate,
    /// Another sweep was already in flight; this request did nothing
    Rejected,
    /// The sweep panicked
    Failed(String),
}

impl SweepOutcome {
    pub fn fetched_new_data(&self) -> bool {
        matches!(self, SweepOutcome::Refreshed(_))
    }
}

struct Inner {
    orchestrator: Arc<ContestFetchOrchestrator>,
    in_flight: Mutex<bool>,
    fetch_limit: u32,
    runtime: Handle,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, bool> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn sweep(&self, platforms: Vec<String>, force_refresh: bool) -> SweepOutcome {
        info!(platforms = ?platforms, "Starting background fetch");

        let requested = platform::filter_supported(Some(&platforms));
        let to_refresh: Vec<String> = if force_refresh {
            requested
        } else {
            let cache = self.orchestrator.cache();
            requested
                .into_iter()
                .filter(|p| cache.needs_refresh(p))
                .collect()
        };

        if to_refresh.is_empty() {
            info!("No platforms need refreshing (cache is still valid)");
            return SweepOutcome::UpToDate;
        }

        info!(platforms = ?to_refresh, "Refreshing data");
        let options = FetchOptions::for_platforms(to_refresh.clone())
            .with_limit(self.fetch_limit)
            .forced();
        let report = self.orchestrator.refresh(&options).await;

        if !report.failed.is_empty() {
            warn!(platforms = ?report.failed, "Some platforms could not be refreshed");
        }
        if report.fetched.is_empty() {
            SweepOutcome::Unavailable(report.failed)
        } else {
            SweepOutcome::Refreshed(report.fetched)
        }
    }
}

#[derive(Clone)]
pub struct BackgroundFetchCoordinator {
    inner: Arc<Inner>,
}

impl BackgroundFetchCoordinator {
    /// Must be called from within a Tokio runtime; sweeps run on that runtime.
    pub fn new(orchestrator: Arc<ContestFetchOrchestrator>) -> Result<Self> {
        Self::with_fetch_limit(orchestrator, BACKGROUND_FETCH_LIMIT)
    }

    pub fn with_fetch_limit(orchestrator: Arc<ContestFetchOrchestrator>, fetch_limit: u32) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("BackgroundFetchCoordinator must be created inside a Tokio runtime")?;
        Ok(Self {
            inner: Arc::new(Inner {
                orchestrator,
                in_flight: Mutex::new(false),
                fetch_limit,
                runtime,
            }),
        })
    }

    /// Launch a sweep over `platforms` unless one is already running.
    /// Returns whether a new sweep was started.
    pub fn start<F>(&self, platforms: Vec<String>, on_complete: F, force_refresh: bool) -> bool
    where
        F: FnOnce(SweepOutcome) + Send + 'static,
    {
        {
            let mut in_flight = self.inner.in_flight();
            if *in_flight {
                info!("A fetch operation is already in progress");
                self.inner
                    .runtime
                    .spawn(async move { on_complete(SweepOutcome::Rejected) });
                return false;
            }
            *in_flight = true;
        }

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(inner.sweep(platforms, force_refresh))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(error = %message, "Background fetch panicked");
                    SweepOutcome::Failed(message)
                }
            };

            *inner.in_flight() = false;
            on_complete(outcome);
            info!("Background fetch completed");
        });

        true
    }

    pub fn is_in_progress(&self) -> bool {
        *self.inner.in_flight()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
