//! Cinemetrics Storage - Server-Side Result Cache
//!
//! The process-wide cache tier that fronts the warehouse. Entries expire
//! independently after their time-to-live; the two TTL classes are a calling
//! convention of [`ReadThroughCache`], not something the store enforces.
//!
//! There is no module-level singleton. Build a [`ResultCache`] once at
//! startup and hand an `Arc` to whatever needs it.

pub mod cache;

pub use cache::{
    CacheBackend, CacheConfig, CacheEntry, CacheRead, CacheStats, Clock, ManualClock, ReadOrigin,
    ReadThroughCache, ResultCache, ServiceKey, SystemClock, SERVICE_OWNER,
};
