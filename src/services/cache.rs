//! Time-boxed file cache for exchange rates and geolocation.
//!
//! Whole-value replacement only: a write replaces the entire entry file,
//! reads check staleness before use, and every failure degrades to a
//! cache miss.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EntryRef<'a, T> {
    fetched_at: DateTime<Utc>,
    value: &'a T,
}

#[derive(Debug, Deserialize)]
struct Entry<T> {
    fetched_at: DateTime<Utc>,
    value: T,
}

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl_hours: i64,
}

impl FileCache {
    pub fn new(dir: PathBuf, ttl_hours: u64) -> Self {
        Self {
            dir,
            ttl_hours: ttl_hours as i64,
        }
    }

    /// Read a cached value, treating stale, missing, or unreadable
    /// entries as misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let raw = fs::read(&path).ok()?;
        let entry: Entry<T> = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(key, error = %err, "discarding unreadable cache entry");
                return None;
            }
        };

        let age = Utc::now() - entry.fetched_at;
        if age > Duration::hours(self.ttl_hours) {
            tracing::debug!(key, "cache entry is stale");
            return None;
        }
        Some(entry.value)
    }

    /// Store a value, stamping it with the current time. Best-effort:
    /// write failures are logged and swallowed.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let entry = EntryRef {
            fetched_at: Utc::now(),
            value,
        };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(key, error = %err, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(err) = fs::create_dir_all(&self.dir) {
            tracing::debug!(key, error = %err, "failed to create cache directory");
            return;
        }
        if let Err(err) = fs::write(self.path(key), bytes) {
            tracing::debug!(key, error = %err, "failed to write cache entry");
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}
