//! Cache backend trait and usage statistics.
//!
//! Backends are synchronous: nothing in the cache path suspends, and the
//! data fetch that fills a miss is a blocking call owned by the caller.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Storage behind [`ReadThroughCache`](super::ReadThroughCache).
///
/// Implementations must be safe to share across request-handling threads.
/// Concurrent `set` calls for the same key are last-write-wins; no merge
/// semantics are expected.
pub trait CacheBackend<V>: Send + Sync {
    /// Get a live value and when it was stored, or `None` if absent or
    /// expired. Must never return a value past its time-to-live.
    fn get(&self, key: &str) -> Option<(V, DateTime<Utc>)>;

    /// Store a value that expires `ttl` after this call.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Drop every entry.
    fn clear(&self);

    /// Get cache statistics.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including reads of expired entries.
    pub misses: u64,
    /// Number of entries currently held, expired-but-unread ones included.
    pub entry_count: u64,
    /// Number of entries dropped because their time-to-live ran out.
    pub expired: u64,
    /// Number of entries dropped by a full flush.
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of reads served from the cache, 0.0 when nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        // Second and third dashboard sessions hit; the first missed.
        let stats = CacheStats {
            hits: 8,
            misses: 4,
            entry_count: 4,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
