//! Read-through caching for service calls.
//!
//! This is where the two TTL classes are applied: each call names its class
//! and the configuration maps it to a concrete time-to-live. Failed fetches
//! are passed straight back and never stored.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use cinemetrics_core::{CacheSettings, TtlClass};
use tracing::debug;

use super::freshness::CacheRead;
use super::result_cache::ResultCache;
use super::service_key::ServiceKey;
use super::traits::{CacheBackend, CacheStats};

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every call goes straight to the source.
    pub enabled: bool,
    /// TTL for query-parameterized results.
    pub frequent_ttl: Duration,
    /// TTL for reference data.
    pub slow_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequent_ttl: Duration::from_secs(12 * 60 * 60),
            slow_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            frequent_ttl: settings.ttl(TtlClass::FrequentlyChanging),
            slow_ttl: settings.ttl(TtlClass::SlowlyChanging),
        }
    }

    /// Caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the TTL for one class.
    pub fn with_ttl(mut self, class: TtlClass, ttl: Duration) -> Self {
        match class {
            TtlClass::FrequentlyChanging => self.frequent_ttl = ttl,
            TtlClass::SlowlyChanging => self.slow_ttl = ttl,
        }
        self
    }

    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::FrequentlyChanging => self.frequent_ttl,
            TtlClass::SlowlyChanging => self.slow_ttl,
        }
    }
}

/// Read-through cache over a shared backend.
///
/// No single-flight lock is held between a miss and the following `set`:
/// two concurrent misses for the same key both fetch, and the later write
/// wins.
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::new(Arc::new(ResultCache::new()), CacheConfig::default());
/// let read = cache.get_or_fetch(&key, TtlClass::SlowlyChanging, || source.fetch_query(&request))?;
/// ```
pub struct ReadThroughCache<V, C = ResultCache<V>>
where
    C: CacheBackend<V>,
{
    /// The cache backend.
    backend: Arc<C>,
    /// Cache configuration.
    config: CacheConfig,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> ReadThroughCache<V, C>
where
    V: Clone,
    C: CacheBackend<V>,
{
    /// Create a new read-through cache.
    pub fn new(backend: Arc<C>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            _value: PhantomData,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Return the cached value for `key`, or run `fetch` and store its
    /// result under the TTL for `class`.
    ///
    /// An `Err` from `fetch` is returned as-is and leaves the cache
    /// untouched.
    pub fn get_or_fetch<E, F>(
        &self,
        key: &ServiceKey,
        class: TtlClass,
        fetch: F,
    ) -> Result<CacheRead<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if !self.config.enabled {
            return fetch().map(CacheRead::from_source);
        }

        if let Some((value, cached_at)) = self.backend.get(key.as_str()) {
            debug!(
                method = key.method(),
                fingerprint = key.fingerprint().short(),
                "Cache HIT"
            );
            return Ok(CacheRead::from_cache(value, cached_at));
        }

        debug!(
            method = key.method(),
            fingerprint = key.fingerprint().short(),
            "Cache MISS"
        );
        let value = fetch()?;
        self.backend
            .set(key.as_str(), value.clone(), self.config.ttl(class));
        Ok(CacheRead::from_source(value))
    }

    /// Store a value directly.
    pub fn put(&self, key: &ServiceKey, class: TtlClass, value: V) {
        if self.config.enabled {
            self.backend.set(key.as_str(), value, self.config.ttl(class));
        }
    }

    /// Flush the whole backend.
    pub fn clear(&self) {
        self.backend.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }
}

impl<V, C> Clone for ReadThroughCache<V, C>
where
    C: CacheBackend<V>,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            _value: PhantomData,
        }
    }
}
