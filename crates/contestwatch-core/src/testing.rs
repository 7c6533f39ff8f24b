//! Fakes and fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::api::{ApiError, ContestQuery, ContestSource};
use crate::cache::CacheEntry;
use crate::models::{Contest, RawContest, RawId};
use crate::reminders::NotificationSink;
use crate::storage;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

pub fn raw(id: &str, start: &str) -> RawContest {
    RawContest {
        id: Some(RawId::Text(id.to_string())),
        event: Some(format!("Contest {}", id)),
        resource: None,
        start: Some(start.to_string()),
        end: None,
        duration: Some(7200),
        href: Some(format!("https://example.com/{}", id)),
    }
}

pub fn contest(id: &str, platform: &str, start: &str) -> Contest {
    Contest::from_raw(raw(id, start), platform)
}

/// Write a cache file whose timestamp is `age` in the past.
pub fn write_cache_entry(dir: &Path, platform: &str, contests: Vec<Contest>, age: Duration) {
    let mut entry = CacheEntry::new(contests);
    entry.metadata.timestamp = Utc::now() - age;
    storage::write_json(&dir.join(format!("{}_contests.json", platform)), &entry).unwrap();
}

pub enum Scripted {
    Ok(Vec<RawContest>),
    Fail,
    Panic,
}

/// A `ContestSource` that replays scripted responses per platform.
/// Unscripted calls fail like a server error.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
    last_query: Mutex<Option<ContestQuery>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, platform: &str, response: Scripted) {
        lock(&self.responses)
            .entry(platform.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        lock(&self.call_times).clone()
    }

    pub fn last_query(&self) -> Option<ContestQuery> {
        lock(&self.last_query).clone()
    }

    /// Hold every subsequent fetch until `open_gate` is called.
    pub fn close_gate(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn open_gate(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            gate.add_permits(1024);
        }
    }
}

#[async_trait]
impl ContestSource for ScriptedSource {
    async fn fetch_contests(&self, query: &ContestQuery) -> Result<Vec<RawContest>, ApiError> {
        lock(&self.calls).push(query.resource.clone());
        lock(&self.call_times).push(Instant::now());
        *lock(&self.last_query) = Some(query.clone());

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        let next = lock(&self.responses)
            .get_mut(&query.resource)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Scripted::Ok(records)) => Ok(records),
            Some(Scripted::Fail) | None => Err(ApiError::ServerError("scripted failure".to_string())),
            Some(Scripted::Panic) => panic!("scripted panic"),
        }
    }
}

/// A `NotificationSink` that records what it was asked to send.
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    succeed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            succeed: AtomicBool::new(true),
        }
    }

    pub fn set_succeed(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, title: &str, text: &str) -> bool {
        lock(&self.sent).push((title.to_string(), text.to_string()));
        self.succeed.load(Ordering::SeqCst)
    }
}
