//! The application context front ends talk to.
//!
//! `AppContext` is built once at startup and owns every long-lived component:
//! the cache, the rate limiter, the fetch orchestrator and background
//! coordinator, the reminder store and its monitor. Nothing here is global;
//! two contexts pointed at different directories are fully independent.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::Local;
use tracing::info;

use crate::api::{ApiClient, ContestSource, RateLimiter};
use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::fetch::{BackgroundFetchCoordinator, ContestFetchOrchestrator, FetchOptions, SweepOutcome};
use crate::models::{platform, Contest, PlatformInfo, Reminder};
use crate::reminders::{NotificationSink, ReminderMonitor, ReminderStore};

const TEST_NOTIFICATION_TITLE: &str = "Test Notification";
const TEST_NOTIFICATION_TEXT: &str = "This is a test notification from contestwatch";

/// What happened to a user-triggered refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// A background sweep was launched
    Started,
    /// A sweep was already running; the callback receives `SweepOutcome::Rejected`
    AlreadyRunning,
    /// Every configured platform still has valid cached data; nothing was
    /// started and the callback is not called
    CacheStillValid,
}

pub struct AppContext {
    config: Config,
    platforms: Vec<String>,
    cache: Arc<ExpiringCache>,
    orchestrator: Arc<ContestFetchOrchestrator>,
    coordinator: BackgroundFetchCoordinator,
    reminders: Arc<ReminderStore>,
    monitor: Arc<ReminderMonitor>,
    sink: Arc<dyn NotificationSink>,
}

impl AppContext {
    /// Build a context that talks to the configured HTTP endpoint.
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let client = ApiClient::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )?;
        Self::with_source(config, Arc::new(client), sink)
    }

    pub fn with_source(
        config: Config,
        source: Arc<dyn ContestSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let cache = Arc::new(ExpiringCache::new(config.contest_cache_dir()?, config.cache_ttl())?);
        let limiter = Arc::new(RateLimiter::per_minute(config.requests_per_minute));
        let orchestrator = Arc::new(ContestFetchOrchestrator::new(
            Arc::clone(&cache),
            limiter,
            source,
            config.retry_policy(),
        ));
        let coordinator =
            BackgroundFetchCoordinator::with_fetch_limit(Arc::clone(&orchestrator), config.contests_per_platform)?;

        let reminders_path = config.reminders_path()?;
        if let Some(parent) = reminders_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let reminders = Arc::new(ReminderStore::new(reminders_path, config.reminder_lead_minutes));
        let monitor = Arc::new(ReminderMonitor::new(
            Arc::clone(&reminders),
            Arc::clone(&sink),
            config.reminder_poll_interval(),
            config.reminder_purge_after_secs,
        )?);

        let platforms = config.platforms();
        info!(platforms = ?platforms, "Application context ready");

        Ok(Self {
            config,
            platforms,
            cache,
            orchestrator,
            coordinator,
            reminders,
            monitor,
            sink,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured platform domains, in registry order.
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn cache(&self) -> &Arc<ExpiringCache> {
        &self.cache
    }

    pub fn monitor(&self) -> &Arc<ReminderMonitor> {
        &self.monitor
    }

    // ------------------------------------------------------------------
    // Contests
    // ------------------------------------------------------------------

    /// Sorted upcoming contests. `options.platforms == None` means the
    /// configured platforms rather than the whole registry.
    pub async fn upcoming_contests(&self, options: &FetchOptions) -> Vec<Contest> {
        if options.platforms.is_some() {
            return self.orchestrator.get_upcoming_contests(options).await;
        }
        let mut options = options.clone();
        options.platforms = Some(self.platforms.clone());
        self.orchestrator.get_upcoming_contests(&options).await
    }

    /// Look a contest up in cached data (valid or expired), never the network.
    pub async fn find_cached_contest(&self, contest_id: &str) -> Option<Contest> {
        let options = FetchOptions::for_platforms(self.platforms.clone()).cache_only();
        self.orchestrator
            .get_upcoming_contests(&options)
            .await
            .into_iter()
            .find(|c| c.id == contest_id)
    }

    pub fn available_platforms(&self) -> Vec<PlatformInfo> {
        platform::available_platforms()
    }

    /// Latest refresh across the configured platforms, local time, or `"Never"`.
    pub fn last_synced(&self) -> String {
        self.platforms
            .iter()
            .filter_map(|p| self.cache.last_refresh_time(p))
            .max()
            .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string())
    }

    pub fn last_refresh_display(&self, platform: &str) -> String {
        self.cache.last_refresh_display(platform)
    }

    pub fn can_refresh(&self, platform: &str) -> bool {
        self.cache.needs_refresh(platform)
    }

    /// User-triggered refresh of every configured platform whose cache expired.
    pub fn request_refresh<F>(&self, on_complete: F) -> RefreshRequest
    where
        F: FnOnce(SweepOutcome) + Send + 'static,
    {
        if !self.platforms.iter().any(|p| self.cache.needs_refresh(p)) {
            info!("Cache is still valid, skipping refresh");
            return RefreshRequest::CacheStillValid;
        }
        if self.coordinator.start(self.platforms.clone(), on_complete, false) {
            RefreshRequest::Started
        } else {
            RefreshRequest::AlreadyRunning
        }
    }

    /// Background sweep over every configured platform. With `force_refresh`
    /// valid caches are refetched too. Returns whether a sweep was started.
    pub fn start_sync<F>(&self, force_refresh: bool, on_complete: F) -> bool
    where
        F: FnOnce(SweepOutcome) + Send + 'static,
    {
        self.coordinator
            .start(self.platforms.clone(), on_complete, force_refresh)
    }

    pub fn is_syncing(&self) -> bool {
        self.coordinator.is_in_progress()
    }

    pub fn clear_cache(&self, platform: Option<&str>) {
        self.cache.clear(platform);
    }

    // ------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------

    /// Schedule a reminder and make sure the monitor is running.
    pub fn add_reminder(&self, contest: &Contest) -> bool {
        let added = self.reminders.add(contest);
        if added {
            self.monitor.ensure_running();
        }
        added
    }

    pub fn remove_reminder(&self, contest_id: &str) -> bool {
        self.reminders.remove(contest_id)
    }

    pub fn is_reminder_set(&self, contest_id: &str) -> bool {
        self.reminders.is_set(contest_id)
    }

    /// Every stored reminder, soonest notification first.
    pub fn reminders(&self) -> Vec<Reminder> {
        let mut all: Vec<Reminder> = self.reminders.load_all().into_values().collect();
        all.sort_by_key(|r| r.notification_at());
        all
    }

    pub fn start_reminder_monitor(&self) -> bool {
        self.monitor.ensure_running()
    }

    pub fn send_test_notification(&self) -> bool {
        self.sink.send(TEST_NOTIFICATION_TITLE, TEST_NOTIFICATION_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contest, raw, write_cache_entry, RecordingSink, Scripted, ScriptedSource};
    use chrono::Duration as ChronoDuration;
    use tokio::sync::oneshot;

    struct Fixture {
        _dir: tempfile::TempDir,
        source: Arc<ScriptedSource>,
        sink: Arc<RecordingSink>,
        ctx: AppContext,
    }

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config {
            platforms: vec!["codeforces.com".to_string(), "atcoder.jp".to_string()],
            max_attempts: 1,
            cache_dir: Some(dir.path().join("cache")),
            data_dir: Some(dir.path().join("data")),
            ..Config::default()
        }
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let sink = Arc::new(RecordingSink::new());
        let ctx = AppContext::with_source(config_in(&dir), source.clone(), sink.clone()).unwrap();
        Fixture {
            _dir: dir,
            source,
            sink,
            ctx,
        }
    }

    fn cache_dir(f: &Fixture) -> std::path::PathBuf {
        f.ctx.config().contest_cache_dir().unwrap()
    }

    #[test]
    fn test_requires_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppContext::with_source(
            config_in(&dir),
            Arc::new(ScriptedSource::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upcoming_defaults_to_configured_platforms() {
        let f = fixture();
        f.source.push("codeforces.com", Scripted::Ok(vec![raw("cf1", "2030-01-02T10:00:00")]));
        f.source.push("atcoder.jp", Scripted::Ok(vec![raw("ac1", "2030-01-01T10:00:00")]));

        let contests = f.ctx.upcoming_contests(&FetchOptions::default()).await;

        assert_eq!(f.source.calls(), vec!["codeforces.com", "atcoder.jp"]);
        let ids: Vec<&str> = contests.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ac1", "cf1"]);

        // Second read is served from cache
        let again = f.ctx.upcoming_contests(&FetchOptions::default()).await;
        assert_eq!(again.len(), 2);
        assert_eq!(f.source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_last_synced_and_can_refresh() {
        let f = fixture();
        assert_eq!(f.ctx.last_synced(), "Never");
        assert!(f.ctx.can_refresh("atcoder.jp"));

        write_cache_entry(
            &cache_dir(&f),
            "atcoder.jp",
            vec![contest("ac1", "atcoder.jp", "2030-01-01T10:00:00")],
            ChronoDuration::hours(1),
        );

        assert_ne!(f.ctx.last_synced(), "Never");
        assert_eq!(f.ctx.last_synced(), f.ctx.last_refresh_display("atcoder.jp"));
        assert!(!f.ctx.can_refresh("atcoder.jp"));
        assert_eq!(f.ctx.last_refresh_display("codeforces.com"), "Never");
    }

    #[tokio::test]
    async fn test_request_refresh_skips_when_cache_valid() {
        let f = fixture();
        for p in ["codeforces.com", "atcoder.jp"] {
            write_cache_entry(&cache_dir(&f), p, Vec::new(), ChronoDuration::hours(1));
        }

        let outcome = f.ctx.request_refresh(|_| panic!("callback must not run"));
        assert_eq!(outcome, RefreshRequest::CacheStillValid);
        assert!(f.source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_refresh_fetches_expired_platforms() {
        let f = fixture();
        write_cache_entry(&cache_dir(&f), "codeforces.com", Vec::new(), ChronoDuration::hours(1));
        f.source.push("atcoder.jp", Scripted::Ok(vec![raw("ac1", "2030-01-01T10:00:00")]));

        let (tx, rx) = oneshot::channel();
        let outcome = f.ctx.request_refresh(move |o| {
            let _ = tx.send(o);
        });
        assert_eq!(outcome, RefreshRequest::Started);

        assert_eq!(
            rx.await.unwrap(),
            SweepOutcome::Refreshed(vec!["atcoder.jp".to_string()])
        );
        assert_eq!(f.source.calls(), vec!["atcoder.jp"]);
        assert_eq!(f.source.last_query().unwrap().limit, 10);
        assert!(!f.ctx.can_refresh("atcoder.jp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_refresh_is_rejected_while_running() {
        let f = fixture();
        f.source.push("codeforces.com", Scripted::Ok(vec![raw("cf1", "2030-01-02T10:00:00")]));
        f.source.push("atcoder.jp", Scripted::Ok(vec![raw("ac1", "2030-01-01T10:00:00")]));
        f.source.close_gate();

        let (tx1, rx1) = oneshot::channel();
        assert_eq!(
            f.ctx.request_refresh(move |o| {
                let _ = tx1.send(o);
            }),
            RefreshRequest::Started
        );
        assert!(f.ctx.is_syncing());

        let (tx2, rx2) = oneshot::channel();
        assert_eq!(
            f.ctx.request_refresh(move |o| {
                let _ = tx2.send(o);
            }),
            RefreshRequest::AlreadyRunning
        );
        assert_eq!(rx2.await.unwrap(), SweepOutcome::Rejected);

        f.source.open_gate();
        assert!(rx1.await.unwrap().fetched_new_data());
        assert!(!f.ctx.is_syncing());
    }

    #[tokio::test]
    async fn test_find_cached_contest_never_fetches() {
        let f = fixture();
        write_cache_entry(
            &cache_dir(&f),
            "codeforces.com",
            vec![contest("cf9", "codeforces.com", "2030-01-01T10:00:00")],
            ChronoDuration::hours(100),
        );

        assert_eq!(f.ctx.find_cached_contest("cf9").await.unwrap().id, "cf9");
        assert!(f.ctx.find_cached_contest("nope").await.is_none());
        assert!(f.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_reminder_starts_monitor() {
        let f = fixture();
        assert!(!f.ctx.monitor().is_running());

        let c = contest("cf1", "codeforces.com", "2030-01-01T10:00:00");
        assert!(f.ctx.add_reminder(&c));
        assert!(f.ctx.is_reminder_set("cf1"));
        assert!(f.ctx.monitor().is_running());

        let reminders = f.ctx.reminders();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].platform, "Codeforces");
        assert_eq!(reminders[0].notification_time, "2030-01-01 15:00:00");

        assert!(f.ctx.remove_reminder("cf1"));
        assert!(!f.ctx.is_reminder_set("cf1"));
    }

    #[tokio::test]
    async fn test_rejected_reminder_does_not_start_monitor() {
        let f = fixture();
        let mut c = contest("cf1", "codeforces.com", "2030-01-01T10:00:00");
        c.start_datetime = None;

        assert!(!f.ctx.add_reminder(&c));
        assert!(!f.ctx.monitor().is_running());
    }

    #[tokio::test]
    async fn test_reminders_sorted_by_notification_time() {
        let f = fixture();
        f.ctx.add_reminder(&contest("late", "codeforces.com", "2030-01-02T10:00:00"));
        f.ctx.add_reminder(&contest("early", "atcoder.jp", "2030-01-01T10:00:00"));

        let ids: Vec<String> = f.ctx.reminders().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_send_test_notification() {
        let f = fixture();
        assert!(f.ctx.send_test_notification());
        assert_eq!(
            f.sink.sent(),
            vec![(TEST_NOTIFICATION_TITLE.to_string(), TEST_NOTIFICATION_TEXT.to_string())]
        );
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let f = fixture();
        write_cache_entry(&cache_dir(&f), "atcoder.jp", Vec::new(), ChronoDuration::hours(1));
        assert!(!f.ctx.can_refresh("atcoder.jp"));

        f.ctx.clear_cache(Some("atcoder.jp"));
        assert!(f.ctx.can_refresh("atcoder.jp"));
        assert_eq!(f.ctx.last_synced(), "Never");
    }
}
