//! Where a read-through value came from.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Origin of a value returned by the read-through layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    /// Served from the result cache; carries the time it was stored.
    Cache { stored_at: DateTime<Utc> },
    /// Fetched from the warehouse during this call.
    Source { fetched_at: DateTime<Utc> },
}

/// A value together with its [`ReadOrigin`].
///
/// The service layer only needs [`CacheRead::into_value`]; the origin is
/// there for logging and tests.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    origin: ReadOrigin,
}

impl<T> CacheRead<T> {
    pub fn from_cache(value: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            value,
            origin: ReadOrigin::Cache { stored_at },
        }
    }

    pub fn from_source(value: T) -> Self {
        Self {
            value,
            origin: ReadOrigin::Source {
                fetched_at: Utc::now(),
            },
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn origin(&self) -> ReadOrigin {
        self.origin
    }

    pub fn was_cache_hit(&self) -> bool {
        matches!(self.origin, ReadOrigin::Cache { .. })
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit()
    }

    /// How old the value was at `now`. Zero for values fetched in the future
    /// of `now` (clock skew between a manual clock and the wall clock).
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        let produced = match self.origin {
            ReadOrigin::Cache { stored_at } => stored_at,
            ReadOrigin::Source { fetched_at } => fetched_at,
        };
        now.signed_duration_since(produced)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }
}
