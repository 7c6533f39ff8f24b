use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::models::Contest;
use crate::storage::{self, StorageError};
use crate::utils::format_age;

/// Suffix shared by every per-platform cache file.
const CACHE_FILE_SUFFIX: &str = "_contests.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub timestamp: DateTime<Utc>,
    pub count: usize,
}

/// One platform's cached contest list. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub metadata: CacheMetadata,
    pub contests: Vec<Contest>,
}

impl CacheEntry {
    pub fn new(contests: Vec<Contest>) -> Self {
        Self {
            metadata: CacheMetadata {
                timestamp: Utc::now(),
                count: contests.len(),
            },
            contests,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.metadata.timestamp).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// Result of looking a platform up in both tiers.
enum Lookup {
    Fresh(CacheEntry),
    Expired(CacheEntry),
    Missing,
}

/// Per-platform contest cache with an in-memory tier in front of JSON files.
///
/// Validity is `now - timestamp < ttl`, re-evaluated on every read. Read
/// failures of any kind are cache misses; write failures are logged and
/// swallowed. The memory tier is best-effort and may be ahead of disk after a
/// failed write.
pub struct ExpiringCache {
    cache_dir: PathBuf,
    ttl: Duration,
    memory: Mutex<HashMap<String, CacheEntry>>,
    // Serializes writers to the disk tier within this process
    disk_lock: Mutex<()>,
}

impl ExpiringCache {
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            ttl,
            memory: Mutex::new(HashMap::new()),
            disk_lock: Mutex::new(()),
        })
    }

    fn cache_path(&self, platform: &str) -> PathBuf {
        self.cache_dir.join(format!("{}{}", platform, CACHE_FILE_SUFFIX))
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn disk(&self) -> MutexGuard<'_, ()> {
        self.disk_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_valid_at(&self, metadata: &CacheMetadata, now: DateTime<Utc>) -> bool {
        now - metadata.timestamp < self.ttl
    }

    fn load_disk(&self, platform: &str) -> Option<CacheEntry> {
        match storage::read_json::<CacheEntry>(&self.cache_path(platform)) {
            Ok(entry) => entry,
            Err(e) => {
                error!(platform = platform, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn lookup(&self, platform: &str, now: DateTime<Utc>) -> Lookup {
        let in_memory = self.memory().get(platform).cloned();
        if let Some(ref entry) = in_memory {
            if self.is_valid_at(&entry.metadata, now) {
                debug!(platform = platform, "Memory cache hit");
                return Lookup::Fresh(entry.clone());
            }
        }

        match self.load_disk(platform) {
            Some(entry) if self.is_valid_at(&entry.metadata, now) => {
                debug!(platform = platform, "File cache hit");
                self.memory().insert(platform.to_string(), entry.clone());
                Lookup::Fresh(entry)
            }
            Some(entry) => {
                info!(platform = platform, "Cache has expired");
                Lookup::Expired(entry)
            }
            None => match in_memory {
                Some(entry) => Lookup::Expired(entry),
                None => Lookup::Missing,
            },
        }
    }

    /// Contests for `platform` if a valid entry exists in either tier.
    pub fn get(&self, platform: &str) -> Option<Vec<Contest>> {
        self.get_at(platform, Utc::now())
    }

    pub fn get_at(&self, platform: &str, now: DateTime<Utc>) -> Option<Vec<Contest>> {
        match self.lookup(platform, now) {
            Lookup::Fresh(entry) => Some(entry.contests),
            Lookup::Expired(_) | Lookup::Missing => None,
        }
    }

    /// Contests for `platform` regardless of age. Used as the fallback when
    /// the network is unavailable or the caller asked for cache-only data.
    pub fn get_stale(&self, platform: &str) -> Option<Vec<Contest>> {
        match self.lookup(platform, Utc::now()) {
            Lookup::Fresh(entry) | Lookup::Expired(entry) => Some(entry.contests),
            Lookup::Missing => None,
        }
    }

    /// Replace the cached contests for `platform` in both tiers.
    pub fn put(&self, platform: &str, contests: Vec<Contest>) {
        self.store(platform, CacheEntry::new(contests));
    }

    fn store(&self, platform: &str, entry: CacheEntry) {
        let count = entry.metadata.count;
        self.memory().insert(platform.to_string(), entry.clone());

        let _guard = self.disk();
        match storage::write_json(&self.cache_path(platform), &entry) {
            Ok(()) => info!(platform = platform, count = count, "Cached contests"),
            Err(e) => error!(platform = platform, error = %e, "Cache write failed"),
        }
    }

    pub fn needs_refresh(&self, platform: &str) -> bool {
        self.needs_refresh_at(platform, Utc::now())
    }

    pub fn needs_refresh_at(&self, platform: &str, now: DateTime<Utc>) -> bool {
        !matches!(self.lookup(platform, now), Lookup::Fresh(_))
    }

    /// Timestamp of the last successful `put`, even if it has since expired.
    pub fn last_refresh_time(&self, platform: &str) -> Option<DateTime<Utc>> {
        match self.lookup(platform, Utc::now()) {
            Lookup::Fresh(entry) | Lookup::Expired(entry) => Some(entry.metadata.timestamp),
            Lookup::Missing => None,
        }
    }

    /// Last refresh as local `YYYY-MM-DD HH:MM:SS`, or `"Never"`.
    pub fn last_refresh_display(&self, platform: &str) -> String {
        self.last_refresh_time(platform)
            .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string())
    }

    /// Relative age of the cached data ("5m ago"), if any exists.
    pub fn age_display(&self, platform: &str) -> Option<String> {
        match self.lookup(platform, Utc::now()) {
            Lookup::Fresh(entry) | Lookup::Expired(entry) => Some(entry.age_display()),
            Lookup::Missing => None,
        }
    }

    /// Drop one platform's entry, or every platform's when `platform` is `None`.
    pub fn clear(&self, platform: Option<&str>) {
        match platform {
            Some(platform) => self.clear_platform(platform),
            None => self.clear_all(),
        }
    }

    fn clear_platform(&self, platform: &str) {
        self.memory().remove(platform);

        let _guard = self.disk();
        match storage::remove_file(&self.cache_path(platform)) {
            Ok(true) => info!(platform = platform, "Cleared cache"),
            Ok(false) => {}
            Err(e) => error!(platform = platform, error = %e, "Failed to clear cache"),
        }
    }

    fn clear_all(&self) {
        self.memory().clear();

        let _guard = self.disk();
        if let Err(e) = self.remove_cache_files() {
            error!(error = %e, "Failed to clear cache directory");
        }
        info!("Cleared all platform caches");
    }

    fn remove_cache_files(&self) -> Result<(), StorageError> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.cache_dir.clone(),
                    source,
                })
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_cache_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(CACHE_FILE_SUFFIX))
                .unwrap_or(false);
            if is_cache_file {
                storage::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
