//! Time-to-live cache with lazy, read-triggered eviction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A cached value and the time it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Epoch milliseconds
    pub captured_at: i64,
}

impl<T> CacheEntry<T> {
    /// Fresh while `now - captured_at <= ttl`; stale once the TTL is exceeded.
    fn is_fresh(&self, now: i64, ttl_millis: i64) -> bool {
        now.saturating_sub(self.captured_at) <= ttl_millis
    }
}

/// Cache keyed by a logical name with one TTL for the whole instance.
///
/// There is no background sweep: an expired entry is removed by the
/// [`TtlCache::get`] that finds it. Writes replace the previous entry.
/// Time is passed in explicitly so callers decide which clock drives it.
#[derive(Debug, Clone)]
pub struct TtlCache<T> {
    name: &'static str,
    ttl_millis: i64,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, ttl_millis: i64) -> Self {
        Self {
            name,
            ttl_millis,
            entries: HashMap::new(),
        }
    }

    /// Rebuild from persisted entries. Nothing is dropped here; stale
    /// entries go away on their first read.
    pub fn from_entries(
        name: &'static str,
        ttl_millis: i64,
        entries: HashMap<String, CacheEntry<T>>,
    ) -> Self {
        Self {
            name,
            ttl_millis,
            entries,
        }
    }

    pub fn ttl_millis(&self) -> i64 {
        self.ttl_millis
    }

    /// Return a copy of the value under `key`, or `None` on a miss.
    /// An entry older than the TTL counts as a miss and is deleted.
    pub fn get(&mut self, key: &str, now: i64) -> Option<T> {
        let fresh = match self.entries.get(key) {
            Some(entry) => entry.is_fresh(now, self.ttl_millis),
            None => {
                debug!(cache = self.name, key, "Cache miss");
                return None;
            }
        };

        if !fresh {
            debug!(cache = self.name, key, "Cache entry expired");
            self.entries.remove(key);
            return None;
        }

        debug!(cache = self.name, key, "Cache hit");
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Insert or overwrite `key`, captured at `now`.
    pub fn put(&mut self, key: impl Into<String>, value: T, now: i64) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                captured_at: now,
            },
        );
    }

    /// Capture time of `key` without checking freshness or evicting.
    pub fn captured_at(&self, key: &str) -> Option<i64> {
        self.entries.get(key).map(|e| e.captured_at)
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including ones not yet found stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All stored entries, the persisted form.
    pub fn entries(&self) -> &HashMap<String, CacheEntry<T>> {
        &self.entries
    }
}
