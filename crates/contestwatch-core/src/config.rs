//! Application configuration management.
//!
//! Configuration is stored at `~/.config/contestwatch/config.json`. Every
//! field has a default, so a missing file or a partial file both load. The
//! API key can also come from the `CONTESTWATCH_API_KEY` environment variable,
//! which wins over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::api::rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
use crate::fetch::orchestrator::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};
use crate::fetch::{RetryPolicy, BACKGROUND_FETCH_LIMIT};
use crate::models::platform;
use crate::reminders::{DEFAULT_LEAD_MINUTES, DEFAULT_POLL_INTERVAL, DEFAULT_PURGE_AFTER_SECS, REMINDERS_FILE};
use crate::storage;

/// Application name used for config/cache/data directory paths
const APP_NAME: &str = "contestwatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides `api_key`
pub const API_KEY_ENV: &str = "CONTESTWATCH_API_KEY";

/// Cache validity window in hours
const DEFAULT_CACHE_TTL_HOURS: i64 = 48;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub platforms: Vec<String>,
    pub cache_ttl_hours: i64,
    pub contests_per_platform: u32,
    pub requests_per_minute: usize,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_secs: u64,
    pub reminder_lead_minutes: i64,
    pub reminder_poll_secs: u64,
    pub reminder_purge_after_secs: i64,
    pub cache_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            platforms: platform::all_domains(),
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            contests_per_platform: BACKGROUND_FETCH_LIMIT,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY.as_secs(),
            reminder_lead_minutes: DEFAULT_LEAD_MINUTES,
            reminder_poll_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            reminder_purge_after_secs: DEFAULT_PURGE_AFTER_SECS,
            cache_dir: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Option<Self> = storage::read_json(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        storage::write_json(path, self)
            .with_context(|| format!("Failed to save config to {}", path.display()))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// A non-empty key replaces whatever the file said.
    pub fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// Configured platforms that the registry knows about, in order.
    /// An empty list means every platform.
    pub fn platforms(&self) -> Vec<String> {
        platform::filter_supported(Some(&self.platforms))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory holding the per-platform `*_contests.json` files
    pub fn contest_cache_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("contests"))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("logs"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn reminders_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(REMINDERS_FILE))
    }

    /// Cache lifetime. Values too large for a `chrono::Duration` fall back to the default.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.cache_ttl_hours)
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_CACHE_TTL_HOURS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.retry_base_delay_secs),
        }
    }

    pub fn reminder_poll_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_poll_secs.max(1))
    }
}
