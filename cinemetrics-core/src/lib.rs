//! Cinemetrics Core - Shared Types
//!
//! Filter validation, content-addressed cache keys, the query catalogue,
//! the warehouse seam, errors and configuration. Every other Cinemetrics
//! crate builds on these.

pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod query;
pub mod source;

pub use config::{
    CacheSettings, DashboardConfig, FilterDefaults, LogSettings, QuerySettings,
    ReferenceDefaults, CONFIG_PATH_ENV,
};
pub use error::{
    CinemetricsError, CinemetricsResult, CodecError, ConfigError, FetchError, FilterError,
};
pub use filter::{
    parse_year_range, FilterInput, FilterSet, RatingRange, RuntimeRange, ValueRange, YearRange,
};
pub use fingerprint::{canonical_json, derive, Fingerprint, KeyArgs, FINGERPRINT_HEX_LEN};
pub use query::{QueryKind, QueryRequest, TtlClass};
pub use source::{DataSource, Table};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_filter_set() -> impl Strategy<Value = FilterSet> {
        (
            (1894i32..2025, 0i32..40),
            prop::collection::vec("[A-Z][a-z]{2,8}", 0..4),
            (0u8..=100, 0u8..=100),
            (0i64..300, 0i64..300),
        )
            .prop_map(|((start, span), genres, (r1, r2), (m1, m2))| FilterSet {
                year_range: YearRange::new(start, start + span),
                genres,
                rating_range: RatingRange::new(
                    f64::from(r1.min(r2)) / 10.0,
                    f64::from(r1.max(r2)) / 10.0,
                ),
                runtime_range: RuntimeRange::new(m1.min(m2), m1.max(m2)),
            })
    }

    fn fingerprint_of(filters: &FilterSet) -> Fingerprint {
        QueryKind::TopMovies
            .request(
                &FilterInput::from_filter_set(filters),
                &QuerySettings::default(),
            )
            .map(|r| r.fingerprint())
            .unwrap_or_else(|e| panic!("valid filters rejected: {e}"))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Deriving twice from equal filters always agrees.
        #[test]
        fn prop_fingerprint_deterministic(filters in arb_filter_set()) {
            let copy = filters.clone();
            prop_assert_eq!(fingerprint_of(&filters), fingerprint_of(&copy));
        }

        /// Any single-field perturbation changes the fingerprint.
        #[test]
        fn prop_fingerprint_sensitive(filters in arb_filter_set(), field in 0usize..5) {
            let mut changed = filters.clone();
            match field {
                0 => changed.year_range.low -= 1,
                1 => changed.year_range.high += 1,
                2 => changed.genres.push("Western".to_string()),
                3 => changed.rating_range.high += 0.5,
                _ => changed.runtime_range.high += 1,
            }
            prop_assert_ne!(fingerprint_of(&filters), fingerprint_of(&changed));
        }

        /// The genre selection is a set: its order never matters.
        #[test]
        fn prop_fingerprint_ignores_genre_order(
            (filters, shuffled) in arb_filter_set().prop_flat_map(|f| {
                let genres = f.genres.clone();
                (Just(f), Just(genres).prop_shuffle())
            })
        ) {
            let reordered = FilterSet { genres: shuffled, ..filters.clone() };
            prop_assert_eq!(fingerprint_of(&filters), fingerprint_of(&reordered));
        }

        /// Fingerprints are always fixed-length hex.
        #[test]
        fn prop_fingerprint_fixed_length(filters in arb_filter_set()) {
            let fp = fingerprint_of(&filters);
            prop_assert_eq!(fp.as_str().len(), FINGERPRINT_HEX_LEN);
        }
    }
}
