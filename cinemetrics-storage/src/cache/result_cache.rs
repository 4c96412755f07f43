//! In-memory result store with per-entry expiry.

use super::clock::{Clock, SystemClock};
use super::traits::{CacheBackend, CacheStats};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One stored result.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub generated_at: DateTime<Utc>,
    pub ttl: Duration,
    /// `None` when `generated_at + ttl` is past the representable range.
    pub expires_at: Option<DateTime<Utc>>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, generated_at: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| generated_at.checked_add_signed(ttl));
        Self {
            value,
            generated_at,
            ttl,
            expires_at,
        }
    }

    /// Expired strictly after `generated_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// Process-wide key-value store fronting expensive fetches.
///
/// Backed by a sharded concurrent map, so reads and writes for different
/// keys never contend on a single lock. Expiry is lazy: an expired entry is
/// removed by the read that finds it.
pub struct ResultCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evictions: AtomicU64,
}

impl<V> ResultCache<V> {
    /// Empty cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry now. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        self.expired.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

impl<V: Clone + Send + Sync> ResultCache<V> {
    /// Get a live value, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Get a live entry with its timestamps.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let found = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(Ok((*entry).clone())),
            Some(_) => Some(Err(())),
            None => None,
        };

        match found {
            Some(Ok(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(Err(())) => {
                // The shard guard from `get` is released above; a concurrent
                // fresh `set` for this key is left alone.
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.is_expired(now))
                    .is_some()
                {
                    self.expired.fetch_add(1, Ordering::Relaxed);
                }
                self.record_miss();
                None
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.insert(key.into(), entry);
    }

    /// Full flush.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.evictions.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for ResultCache<V> {
    fn get(&self, key: &str) -> Option<(V, DateTime<Utc>)> {
        self.get_entry(key)
            .map(|entry| (entry.value, entry.generated_at))
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        ResultCache::set(self, key, value, ttl);
    }

    fn clear(&self) {
        ResultCache::clear(self);
    }

    fn stats(&self) -> CacheStats {
        ResultCache::stats(self)
    }
}
