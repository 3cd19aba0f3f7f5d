//! Per-task LM response cache.
//!
//! Repeated runs over the same output directory reuse earlier responses instead of
//! calling the model again. Entries are keyed by task id; the file-backed cache stores
//! them at `<dir>/<task_id>.json.log`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::brain::CompletionResponse;
use crate::error::Result;
use crate::types::SideAssignment;

/// A persisted LM response together with what is needed to interpret it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub response: CompletionResponse,
    #[serde(default)]
    pub cost: f64,
    /// Side assignment used when the prompt was rendered, if sides were randomized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<SideAssignment>,
    pub created_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(response: CompletionResponse, cost: f64, sides: Option<SideAssignment>) -> Self {
        Self {
            response,
            cost,
            sides,
            created_at: Utc::now(),
        }
    }
}

/// Storage for cached responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Return the entry for `key` if present and well-formed.
    async fn load(&self, key: &str) -> Option<CachedResponse>;

    /// Persist the entry for `key`, replacing any previous one.
    async fn store(&self, key: &str, entry: &CachedResponse) -> Result<()>;
}

/// File-backed cache rooted at an output directory.
#[derive(Debug, Clone)]
pub struct FileResponseCache {
    dir: PathBuf,
}

impl FileResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json.log"))
    }
}

#[async_trait]
impl ResponseCache for FileResponseCache {
    async fn load(&self, key: &str) -> Option<CachedResponse> {
        let path = self.path_for(key);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    task_id = %key,
                    path = %path.display(),
                    error = %e,
                    "Ignoring malformed cache entry"
                );
                None
            }
        }
    }

    async fn store(&self, key: &str, entry: &CachedResponse) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_string_pretty(entry)?;
        tokio::fs::write(self.path_for(key), body).await?;
        Ok(())
    }
}

/// In-memory cache, used where nothing should touch disk.
#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn load(&self, key: &str) -> Option<CachedResponse> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    async fn store(&self, key: &str, entry: &CachedResponse) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry.clone());
        Ok(())
    }
}

/// Return the cached entry for `key`, or run `call` and persist its result.
///
/// Entries rejected by `is_usable` count as misses. A fresh entry that `is_usable`
/// rejects is returned but not stored, so the next run asks the model again.
pub async fn cached_or_else<V, F, Fut>(
    cache: &dyn ResponseCache,
    key: &str,
    is_usable: V,
    call: F,
) -> Result<CachedResponse>
where
    V: Fn(&CachedResponse) -> bool,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedResponse>>,
{
    if let Some(entry) = cache.load(key).await {
        if is_usable(&entry) {
            tracing::debug!(task_id = %key, "Using cached LM response");
            return Ok(entry);
        }
        tracing::warn!(task_id = %key, "Cached LM response is unusable; calling the model again");
    }
    let entry = call().await?;
    if is_usable(&entry) {
        cache.store(key, &entry).await?;
    }
    Ok(entry)
}
