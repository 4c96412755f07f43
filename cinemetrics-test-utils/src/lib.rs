//! Cinemetrics Test Utilities
//!
//! Centralized test infrastructure for the Cinemetrics workspace:
//! - Proptest generators for filters and tables
//! - A scripted data source that records every query it receives
//! - Test fixtures for the common dashboard scenarios
//! - Custom assertions for table and filter checks

// Re-export the controllable clock from its source crate
pub use cinemetrics_storage::ManualClock;

// Re-export core types for convenience
pub use cinemetrics_core::{
    DataSource, FetchError, FilterError, FilterInput, FilterSet, Fingerprint, QueryKind,
    QueryRequest, QuerySettings, RatingRange, RuntimeRange, Table, YearRange,
};

use arrow::array::{
    ArrayRef, BooleanArray, DictionaryArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Cinemetrics inputs.

    use super::*;
    use proptest::prelude::*;

    const GENRES: [&str; 8] = [
        "Action", "Comedy", "Drama", "Thriller", "Horror", "Romance", "Sci-Fi", "Western",
    ];

    /// Generate an ordered year interval inside the catalogue bounds.
    pub fn arb_year_range() -> impl Strategy<Value = YearRange> {
        (1894i32..2025, 0i32..60).prop_map(|(low, span)| YearRange::new(low, (low + span).min(2025)))
    }

    /// Generate an ordered rating interval on a 0.1 grid.
    pub fn arb_rating_range() -> impl Strategy<Value = RatingRange> {
        (0u8..=100, 0u8..=100).prop_map(|(a, b)| {
            RatingRange::new(f64::from(a.min(b)) / 10.0, f64::from(a.max(b)) / 10.0)
        })
    }

    /// Generate an ordered runtime interval in minutes.
    pub fn arb_runtime_range() -> impl Strategy<Value = RuntimeRange> {
        (0i64..=300, 0i64..=300).prop_map(|(a, b)| RuntimeRange::new(a.min(b), a.max(b)))
    }

    /// Generate a genre selection, possibly empty.
    pub fn arb_genres() -> impl Strategy<Value = Vec<String>> {
        prop::sample::subsequence(GENRES.to_vec(), 0..=4)
            .prop_map(|genres| genres.into_iter().map(str::to_string).collect())
    }

    /// Generate a valid FilterSet.
    pub fn arb_filter_set() -> impl Strategy<Value = FilterSet> {
        (
            arb_year_range(),
            arb_genres(),
            arb_rating_range(),
            arb_runtime_range(),
        )
            .prop_map(|(year_range, genres, rating_range, runtime_range)| FilterSet {
                year_range,
                genres,
                rating_range,
                runtime_range,
            })
    }

    /// Generate raw sidebar input that always validates.
    pub fn arb_filter_input() -> impl Strategy<Value = FilterInput> {
        arb_filter_set().prop_map(|filters| FilterInput::from_filter_set(&filters))
    }

    /// Generate a table of 0-15 rows over a non-empty subset of the
    /// supported column types. Every column may contain nulls.
    pub fn arb_record_batch() -> impl Strategy<Value = RecordBatch> {
        (0usize..16).prop_flat_map(|rows| {
            (
                prop::collection::vec(prop::option::of("[a-zA-Z0-9 :'-]{0,24}"), rows),
                prop::collection::vec(prop::option::of(any::<i64>()), rows),
                prop::collection::vec(prop::option::of(-1.0e9f64..1.0e9), rows),
                prop::collection::vec(prop::option::of(any::<bool>()), rows),
                prop::collection::vec(prop::option::of(prop::sample::select(GENRES.to_vec())), rows),
                1u8..32,
            )
                .prop_map(|(titles, votes, ratings, flags, genres, mask)| {
                    let candidates: Vec<(Field, ArrayRef)> = vec![
                        (
                            Field::new("movie_title", DataType::Utf8, true),
                            Arc::new(StringArray::from(titles)),
                        ),
                        (
                            Field::new("total_votes", DataType::Int64, true),
                            Arc::new(Int64Array::from(votes)),
                        ),
                        (
                            Field::new("average_rating", DataType::Float64, true),
                            Arc::new(Float64Array::from(ratings)),
                        ),
                        (
                            Field::new("is_adult", DataType::Boolean, true),
                            Arc::new(BooleanArray::from(flags)),
                        ),
                        (
                            Field::new(
                                "genre",
                                DataType::Dictionary(
                                    Box::new(DataType::Int32),
                                    Box::new(DataType::Utf8),
                                ),
                                true,
                            ),
                            Arc::new(genres.into_iter().collect::<DictionaryArray<Int32Type>>()),
                        ),
                    ];
                    let (fields, columns): (Vec<Field>, Vec<ArrayRef>) = candidates
                        .into_iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, pair)| pair)
                        .unzip();
                    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
                        .unwrap_or_else(|e| panic!("generated columns disagree: {e}"))
                })
        })
    }
}

// ============================================================================
// SCRIPTED DATA SOURCE
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`DataSource`] with scripted responses per query.
///
/// A queued one-shot response wins over the standing response for a query.
/// Every request is recorded so tests can count fetches.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    standing: Mutex<HashMap<QueryKind, Result<Table, FetchError>>>,
    queued: Mutex<HashMap<QueryKind, VecDeque<Result<Table, FetchError>>>>,
    calls: Mutex<Vec<QueryRequest>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `kind` query with `table`.
    pub fn with_table(self, kind: QueryKind, table: Table) -> Self {
        self.set_table(kind, table);
        self
    }

    /// Answer every `kind` query with a source error.
    pub fn with_failure(self, kind: QueryKind, reason: &str) -> Self {
        self.set_failure(kind, reason);
        self
    }

    pub fn set_table(&self, kind: QueryKind, table: Table) {
        lock(&self.standing).insert(kind, Ok(table));
    }

    pub fn set_failure(&self, kind: QueryKind, reason: &str) {
        lock(&self.standing).insert(kind, Err(source_error(kind, reason)));
    }

    /// Queue a response used by the next `kind` query only.
    pub fn push_response(&self, kind: QueryKind, response: Result<Table, FetchError>) {
        lock(&self.queued).entry(kind).or_default().push_back(response);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<QueryRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, kind: QueryKind) -> usize {
        lock(&self.calls).iter().filter(|r| r.kind() == kind).count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }
}

fn source_error(kind: QueryKind, reason: &str) -> FetchError {
    FetchError::Source {
        query: kind.name().to_string(),
        reason: reason.to_string(),
    }
}

impl DataSource for ScriptedSource {
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        let kind = request.kind();
        lock(&self.calls).push(request.clone());

        if let Some(response) = lock(&self.queued).get_mut(&kind).and_then(VecDeque::pop_front) {
            return response;
        }
        lock(&self.standing)
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Err(source_error(kind, "no scripted response")))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// The sidebar state `{year: [2000, 2010], genres: [], rating: [7, 10],
    /// runtime: [0, 300]}`.
    pub fn scenario_filter_input() -> FilterInput {
        FilterInput {
            date_range: Some(vec![
                Some("2000-01-01".to_string()),
                Some("2010-12-31".to_string()),
            ]),
            genres: Some(vec![]),
            rating_range: Some(vec![7.0, 10.0]),
            runtime_range: Some(vec![0, 300]),
        }
    }

    /// The scenario input with a different year window.
    pub fn narrowed_filter_input(start: i32, end: i32) -> FilterInput {
        FilterInput {
            date_range: Some(vec![
                Some(format!("{start:04}-01-01")),
                Some(format!("{end:04}-01-01")),
            ]),
            ..scenario_filter_input()
        }
    }

    /// Raw input whose date range cannot be parsed.
    pub fn invalid_date_input() -> FilterInput {
        FilterInput {
            date_range: Some(vec![Some("soon".to_string()), None]),
            ..scenario_filter_input()
        }
    }

    /// Three top-rated movies with every column the chart binds.
    pub fn top_movies_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("movie_title", DataType::Utf8, false),
            Field::new("release_year", DataType::Int64, false),
            Field::new("genres", DataType::Utf8, true),
            Field::new("runtime_minutes", DataType::Int64, true),
            Field::new("is_adult", DataType::Utf8, false),
            Field::new("average_rating", DataType::Float64, false),
            Field::new("total_votes", DataType::Int64, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["Memento", "Amelie", "Spirited Away"])),
            Arc::new(Int64Array::from(vec![2000, 2001, 2001])),
            Arc::new(StringArray::from(vec![
                Some("Mystery,Thriller"),
                Some("Comedy,Romance"),
                None,
            ])),
            Arc::new(Int64Array::from(vec![Some(113), Some(122), Some(125)])),
            Arc::new(StringArray::from(vec!["No", "No", "No"])),
            Arc::new(Float64Array::from(vec![8.4, 8.3, 8.6])),
            Arc::new(Int64Array::from(vec![1_300_000, 780_000, 850_000])),
        ];
        RecordBatch::try_new(schema, columns)
            .unwrap_or_else(|e| panic!("fixture columns disagree: {e}"))
    }

    /// Yearly release counts and ratings.
    pub fn yearly_trends_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("release_year", DataType::Int64, false),
            Field::new("total_movies", DataType::Int64, false),
            Field::new("average_rating", DataType::Float64, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![2000, 2001, 2002])),
            Arc::new(Int64Array::from(vec![4_100, 4_350, 4_520])),
            Arc::new(Float64Array::from(vec![6.1, 6.2, 6.0])),
        ];
        RecordBatch::try_new(schema, columns)
            .unwrap_or_else(|e| panic!("fixture columns disagree: {e}"))
    }

    /// Zero rows over `[movie_title, average_rating]`.
    pub fn empty_table() -> RecordBatch {
        RecordBatch::new_empty(Arc::new(Schema::new(vec![
            Field::new("movie_title", DataType::Utf8, true),
            Field::new("average_rating", DataType::Float64, true),
        ])))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Cinemetrics-specific validation.

    use super::*;

    /// Assert two tables agree on column names, types and values.
    #[track_caller]
    pub fn assert_same_table(actual: &RecordBatch, expected: &RecordBatch) {
        assert_eq!(
            actual.schema(),
            expected.schema(),
            "Schema mismatch: {:?} vs {:?}",
            actual.schema(),
            expected.schema()
        );
        assert_eq!(actual.num_rows(), expected.num_rows(), "Row count mismatch");
        assert_eq!(actual, expected, "Column values differ");
    }

    /// Assert that validation failed on the date range.
    #[track_caller]
    pub fn assert_invalid_dates<T: std::fmt::Debug>(result: &Result<T, FilterError>) {
        match result {
            Err(FilterError::InvalidDateRange { .. }) | Err(FilterError::MissingField { .. }) => {}
            other => panic!("Expected date range error, got: {:?}", other),
        }
    }

    /// Assert a fingerprint has the fixed hex shape.
    #[track_caller]
    pub fn assert_fingerprint_shape(fingerprint: &Fingerprint) {
        let text = fingerprint.as_str();
        assert_eq!(text.len(), cinemetrics_core::FINGERPRINT_HEX_LEN);
        assert!(
            text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "Fingerprint is not lowercase hex: {text}"
        );
    }
}
