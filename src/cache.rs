//! Product search cache.
//!
//! Keyed by the trimmed search query (empty string covers the unfiltered
//! listing). Entries expire after the configured TTL; expired entries are
//! treated as misses and overwritten by the next fill. Cursor continuations
//! never touch the cache. The map is persisted to a JSON file under the data
//! directory so a restart does not start cold.
use crate::model::Product;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

const CACHE_FILE: &str = "product-cache.json";

/// One cached result page, including the cursor needed to load more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPage {
    pub products: Vec<Product>,
    pub total_count: u64,
    pub next_page_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(flatten)]
    page: CachedPage,
    timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SearchCache {
    path: PathBuf,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SearchCache {
    pub fn new(data_dir: &Path, ttl_secs: u64) -> Self {
        let path = data_dir.join(CACHE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "discarding unreadable product cache");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            ttl: Duration::seconds(ttl_secs as i64),
            entries: Mutex::new(entries),
        }
    }

    fn key(query: &str) -> String {
        query.trim().to_string()
    }

    pub fn get(&self, query: &str) -> Option<CachedPage> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&Self::key(query))?;
        if Utc::now() - entry.timestamp >= self.ttl {
            debug!(query, "product cache entry expired");
            return None;
        }
        Some(entry.page.clone())
    }

    pub fn put(&self, query: &str, page: CachedPage) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            Self::key(query),
            CacheEntry {
                page,
                timestamp: Utc::now(),
            },
        );
        self.persist(&entries);
    }

    /// Best-effort write; a failed persist only costs a warm start.
    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "product cache does not serialize");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, raw) {
            warn!(error = %err, path = %self.path.display(), "failed to persist product cache");
        }
    }

    #[cfg(test)]
    fn backdate(&self, query: &str, by: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&Self::key(query)) {
            entry.timestamp = entry.timestamp - by;
        }
    }
}
