use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, io, path::{Path, PathBuf}, time::Duration};
use tracing::warn;

use crate::error::ForecastError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    body: String,
}

/// On-disk cache of successful GET bodies, keyed by the full request URL.
///
/// The whole cache lives in one JSON file. Nothing guards against two
/// processes writing it at once; the later write wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    path: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { path: path.into(), ttl }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached body for `url` if it is younger than the TTL.
    pub fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Utc::now())
    }

    pub fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<String> {
        self.read_entries()
            .remove(url)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.body)
    }

    /// Store `body` for `url`, dropping any entries that have expired.
    pub fn put(&self, url: &str, body: &str) -> Result<(), ForecastError> {
        self.put_at(url, body, Utc::now())
    }

    pub fn put_at(&self, url: &str, body: &str, now: DateTime<Utc>) -> Result<(), ForecastError> {
        let mut entries = self.read_entries();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        entries.insert(url.to_string(), CacheEntry { fetched_at: now, body: body.to_string() });

        self.write_entries(&entries).map_err(|source| ForecastError::Cache {
            path: self.path.clone(),
            source,
        })
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A negative age (entry from the future) fails `to_std` and counts as stale.
        match (now - entry.fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => false,
        }
    }

    fn read_entries(&self) -> HashMap<String, CacheEntry> {
        if !self.path.exists() {
            return HashMap::new();
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable response cache");
                return HashMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring corrupt response cache");
            HashMap::new()
        })
    }

    fn write_entries(&self, entries: &HashMap<String, CacheEntry>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(entries).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }
}
