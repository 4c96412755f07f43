//! Result cache with explicit expiry and cache-read metadata.
//!
//! # Expiry
//!
//! Every entry records when it was generated and how long it lives. A read
//! at `now > generated_at + ttl` treats the entry as absent and drops it.
//! Nothing sweeps in the background; [`ResultCache::purge_expired`] exists
//! for callers that want to reclaim memory eagerly.
//!
//! # Keys
//!
//! Service-layer keys are built only through [`ServiceKey`], which always
//! carries the owning method name, so two operations with identical
//! argument shapes can never share an entry.
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::new(Arc::new(ResultCache::new()), CacheConfig::default());
//! let key = ServiceKey::for_request(&request);
//! let read = cache.get_or_fetch(&key, TtlClass::FrequentlyChanging, || source.fetch_query(&request))?;
//! if read.was_cache_hit() {
//!     tracing::debug!(age_secs = read.age().as_secs(), "served from cache");
//! }
//! ```

pub mod clock;
pub mod freshness;
pub mod read_through;
pub mod result_cache;
pub mod service_key;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{CacheRead, ReadOrigin};
pub use read_through::{CacheConfig, ReadThroughCache};
pub use result_cache::{CacheEntry, ResultCache};
pub use service_key::{ServiceKey, SERVICE_OWNER};
pub use traits::{CacheBackend, CacheStats};
