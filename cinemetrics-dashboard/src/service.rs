//! Server-side data service.
//!
//! Wraps the warehouse with the shared result cache. Each method is keyed
//! as `DataService.<method>:<fingerprint>` and stored under its query's TTL
//! class. Failed fetches are never cached, and neither are the fallback
//! values the reference lookups return on failure.

use arrow::array::{Array, AsArray};
use arrow::compute::{cast, sort_to_indices, take_record_batch, SortOptions};
use arrow::datatypes::{DataType, Int64Type};
use cinemetrics_core::{
    DataSource, FetchError, QueryKind, QueryRequest, QuerySettings, RatingRange,
    ReferenceDefaults, RuntimeRange, Table, YearRange,
};
use cinemetrics_storage::{CacheStats, ReadThroughCache, ServiceKey};
use tracing::{debug, error, info};

/// Data service over a warehouse `W`.
pub struct DataService<W: DataSource> {
    warehouse: W,
    cache: Option<ReadThroughCache<Table>>,
    settings: QuerySettings,
    reference: ReferenceDefaults,
}

impl<W: DataSource> DataService<W> {
    /// Service without a result cache; every call reaches the warehouse.
    pub fn new(warehouse: W) -> Self {
        Self {
            warehouse,
            cache: None,
            settings: QuerySettings::default(),
            reference: ReferenceDefaults::default(),
        }
    }

    pub fn with_cache(mut self, cache: ReadThroughCache<Table>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_reference_defaults(mut self, reference: ReferenceDefaults) -> Self {
        self.reference = reference;
        self
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Run `request`, reading through the result cache when one is set.
    pub fn fetch(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        self.read_through(request, |_| Ok(()))
    }

    /// Fetch through the cache, storing only tables `check` accepts.
    fn read_through<F>(&self, request: &QueryRequest, check: F) -> Result<Table, FetchError>
    where
        F: Fn(&Table) -> Result<(), FetchError>,
    {
        let load = || {
            let table = self.load(request)?;
            check(&table)?;
            Ok(table)
        };
        match &self.cache {
            None => load(),
            Some(cache) => cache
                .get_or_fetch(
                    &ServiceKey::for_request(request),
                    request.kind().ttl_class(),
                    load,
                )
                .map(|read| read.into_value()),
        }
    }

    fn load(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        let kind = request.kind();
        let table = self.warehouse.fetch_query(request).map_err(|e| {
            error!(query = kind.name(), error = %e, "Error executing query");
            e
        })?;
        match kind {
            // Ascending, so the best movie ends up at the top of a horizontal bar chart.
            QueryKind::TopMovies => sort_by_rating(&table, kind),
            _ => Ok(table),
        }
    }

    pub fn top_movies(
        &self,
        year_range: YearRange,
        genres: Vec<String>,
        rating_range: RatingRange,
        runtime_range: RuntimeRange,
    ) -> Result<Table, FetchError> {
        self.fetch(&QueryRequest::TopMovies {
            year_range,
            genres,
            rating_range,
            runtime_range,
            limit: self.settings.top_n_movies,
            min_votes: self.settings.min_votes_threshold,
        })
    }

    pub fn genre_trends(
        &self,
        year_range: YearRange,
        genres: Vec<String>,
    ) -> Result<Table, FetchError> {
        self.fetch(&QueryRequest::GenreTrends { year_range, genres })
    }

    pub fn runtime_distribution(&self, runtime_range: RuntimeRange) -> Result<Table, FetchError> {
        self.fetch(&QueryRequest::RuntimeDistribution { runtime_range })
    }

    pub fn yearly_trends(&self, year_range: YearRange) -> Result<Table, FetchError> {
        self.fetch(&QueryRequest::YearlyTrends { year_range })
    }

    /// Release years available in the catalogue.
    ///
    /// Falls back to the configured range when the warehouse fails or has
    /// no rated movies.
    pub fn year_range(&self) -> YearRange {
        self.read_through(&QueryRequest::YearBounds, |t| year_bounds_of(t).map(drop))
            .and_then(|table| year_bounds_of(&table))
            .unwrap_or_else(|e| {
                let fallback = self.reference.fallback_year_range();
                error!(
                    error = %e,
                    low = fallback.low,
                    high = fallback.high,
                    "Error fetching year range. Using default range."
                );
                fallback
            })
    }

    /// Distinct genres, sorted. Empty when the warehouse fails.
    pub fn unique_genres(&self) -> Vec<String> {
        self.read_through(&QueryRequest::GenreCatalog, |t| genres_of(t).map(drop))
            .and_then(|table| genres_of(&table))
            .unwrap_or_else(|e| {
                error!(error = %e, "Error fetching unique genres");
                Vec::new()
            })
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("Cache cleared successfully");
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }
}

impl<W: DataSource> DataSource for DataService<W> {
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        self.fetch(request)
    }
}

fn missing_column(kind: QueryKind, column: &str) -> FetchError {
    FetchError::MissingColumn {
        query: kind.name().to_string(),
        column: column.to_string(),
    }
}

fn sort_by_rating(table: &Table, kind: QueryKind) -> Result<Table, FetchError> {
    if table.num_rows() < 2 {
        return Ok(table.clone());
    }
    let column = table
        .column_by_name("average_rating")
        .ok_or_else(|| missing_column(kind, "average_rating"))?;
    let arrow_error = |e: arrow::error::ArrowError| FetchError::Source {
        query: kind.name().to_string(),
        reason: e.to_string(),
    };
    // Unrated movies go last.
    let options = SortOptions {
        descending: false,
        nulls_first: false,
    };
    let indices = sort_to_indices(column, Some(options), None).map_err(arrow_error)?;
    take_record_batch(table, &indices).map_err(arrow_error)
}

fn int_cell(table: &Table, kind: QueryKind, column: &str) -> Result<i64, FetchError> {
    let array = table
        .column_by_name(column)
        .ok_or_else(|| missing_column(kind, column))?;
    let unreadable = |reason: String| FetchError::Source {
        query: kind.name().to_string(),
        reason,
    };
    let ints = cast(array, &DataType::Int64).map_err(|e| unreadable(e.to_string()))?;
    let ints = ints.as_primitive::<Int64Type>();
    if ints.is_empty() || ints.is_null(0) {
        return Err(unreadable(format!("no value for {column}")));
    }
    Ok(ints.value(0))
}

fn year_bounds_of(table: &Table) -> Result<YearRange, FetchError> {
    let kind = QueryKind::YearBounds;
    let low = int_cell(table, kind, "min_year")?;
    let high = int_cell(table, kind, "max_year")?;
    let year = |value: i64| {
        i32::try_from(value).map_err(|_| FetchError::Source {
            query: kind.name().to_string(),
            reason: format!("year {value} out of range"),
        })
    };
    let range = YearRange::new(year(low)?, year(high)?);
    debug!(low = range.low, high = range.high, "Year bounds loaded");
    Ok(range)
}

fn genres_of(table: &Table) -> Result<Vec<String>, FetchError> {
    let kind = QueryKind::GenreCatalog;
    if table.num_rows() == 0 {
        return Err(FetchError::Source {
            query: kind.name().to_string(),
            reason: "no genres returned".to_string(),
        });
    }
    let array = table
        .column_by_name("genre")
        .ok_or_else(|| missing_column(kind, "genre"))?;
    let strings = cast(array, &DataType::Utf8).map_err(|e| FetchError::Source {
        query: kind.name().to_string(),
        reason: e.to_string(),
    })?;
    let mut genres: Vec<String> = strings
        .as_string::<i32>()
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();
    genres.sort();
    genres.dedup();
    Ok(genres)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use cinemetrics_storage::{CacheConfig, ResultCache};
    use cinemetrics_test_utils::fixtures::{top_movies_batch, yearly_trends_batch};
    use cinemetrics_test_utils::ScriptedSource;
    use std::sync::Arc;

    fn cached(source: ScriptedSource) -> DataService<Arc<ScriptedSource>> {
        DataService::new(Arc::new(source)).with_cache(ReadThroughCache::new(
            Arc::new(ResultCache::new()),
            CacheConfig::default(),
        ))
    }

    fn bounds(min: i32, max: i32) -> Table {
        RecordBatch::try_from_iter([
            ("min_year", Arc::new(Int32Array::from(vec![min])) as ArrayRef),
            ("max_year", Arc::new(Int32Array::from(vec![max])) as ArrayRef),
        ])
        .unwrap()
    }

    fn genres(names: &[&str]) -> Table {
        RecordBatch::try_from_iter([(
            "genre",
            Arc::new(StringArray::from(names.to_vec())) as ArrayRef,
        )])
        .unwrap()
    }

    #[test]
    fn test_top_movies_sorted_ascending() {
        let service = cached(ScriptedSource::new().with_table(QueryKind::TopMovies, top_movies_batch()));
        let table = service
            .top_movies(
                YearRange::new(2000, 2010),
                vec![],
                RatingRange::new(7.0, 10.0),
                RuntimeRange::new(0, 300),
            )
            .unwrap();
        let ratings = table
            .column_by_name("average_rating")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        let values: Vec<f64> = ratings.iter().flatten().collect();
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, sorted);
    }

    #[test]
    fn test_unrated_movies_sort_last() {
        let table = RecordBatch::try_from_iter([
            (
                "movie_title",
                Arc::new(StringArray::from(vec!["Unrated", "High", "Low"])) as ArrayRef,
            ),
            (
                "average_rating",
                Arc::new(Float64Array::from(vec![None, Some(9.1), Some(7.4)])) as ArrayRef,
            ),
        ])
        .unwrap();

        let sorted = sort_by_rating(&table, QueryKind::TopMovies).unwrap();
        let titles = sorted
            .column_by_name("movie_title")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let order: Vec<&str> = titles.iter().flatten().collect();
        assert_eq!(order, ["Low", "High", "Unrated"]);
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let service = cached(ScriptedSource::new().with_table(QueryKind::YearlyTrends, yearly_trends_batch()));
        service.yearly_trends(YearRange::new(2000, 2010)).unwrap();
        service.yearly_trends(YearRange::new(2000, 2010)).unwrap();
        service.yearly_trends(YearRange::new(2001, 2010)).unwrap();

        assert_eq!(service.warehouse().call_count(QueryKind::YearlyTrends), 2);
        let stats = service.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let service = cached(ScriptedSource::new().with_failure(QueryKind::YearlyTrends, "warehouse down"));
        assert!(service.yearly_trends(YearRange::new(2000, 2010)).is_err());

        service
            .warehouse()
            .set_table(QueryKind::YearlyTrends, yearly_trends_batch());
        assert!(service.yearly_trends(YearRange::new(2000, 2010)).is_ok());
        assert_eq!(service.warehouse().call_count(QueryKind::YearlyTrends), 2);
    }

    #[test]
    fn test_year_range() {
        let service = cached(ScriptedSource::new().with_table(QueryKind::YearBounds, bounds(1920, 2024)));
        assert_eq!(service.year_range(), YearRange::new(1920, 2024));
        assert_eq!(service.year_range(), YearRange::new(1920, 2024));
        assert_eq!(service.warehouse().call_count(QueryKind::YearBounds), 1);
    }

    #[test]
    fn test_year_range_fallback_is_not_cached() {
        let service = cached(ScriptedSource::new().with_failure(QueryKind::YearBounds, "boom"));
        assert_eq!(service.year_range(), YearRange::new(1900, 2025));

        service.warehouse().set_table(QueryKind::YearBounds, bounds(1950, 2000));
        assert_eq!(service.year_range(), YearRange::new(1950, 2000));
    }

    #[test]
    fn test_unique_genres() {
        let service = cached(
            ScriptedSource::new().with_table(QueryKind::GenreCatalog, genres(&["Drama", "Action", "Drama"])),
        );
        assert_eq!(service.unique_genres(), vec!["Action", "Drama"]);
    }

    #[test]
    fn test_unique_genres_empty_or_failed() {
        let service = cached(ScriptedSource::new().with_table(QueryKind::GenreCatalog, genres(&[])));
        assert!(service.unique_genres().is_empty());
        service.unique_genres();
        assert_eq!(service.warehouse().call_count(QueryKind::GenreCatalog), 2);

        let failing = DataService::new(ScriptedSource::new().with_failure(QueryKind::GenreCatalog, "boom"));
        assert!(failing.unique_genres().is_empty());
    }

    #[test]
    fn test_clear_cache_forces_refetch() {
        let service = cached(ScriptedSource::new().with_table(QueryKind::YearlyTrends, yearly_trends_batch()));
        service.yearly_trends(YearRange::new(2000, 2010)).unwrap();
        service.clear_cache();
        service.yearly_trends(YearRange::new(2000, 2010)).unwrap();
        assert_eq!(service.warehouse().call_count(QueryKind::YearlyTrends), 2);
    }

    #[test]
    fn test_top_movies_without_rating_column() {
        let service = DataService::new(ScriptedSource::new());
        let narrowed = yearly_trends_batch().project(&[0, 1]).unwrap();
        service.warehouse().set_table(QueryKind::TopMovies, narrowed);
        let result = service.top_movies(
            YearRange::new(2000, 2010),
            vec![],
            RatingRange::new(0.0, 10.0),
            RuntimeRange::new(0, 300),
        );
        assert!(matches!(result, Err(FetchError::MissingColumn { .. })));
    }
}
