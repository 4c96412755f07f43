//! A small in-memory movie warehouse.
//!
//! Answers every dashboard query over a fixed catalogue, with the same
//! column names and orderings the real warehouse returns. Used by the demo
//! binary and the integration tests.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use cinemetrics_core::{
    DataSource, FetchError, QueryRequest, RatingRange, RuntimeRange, Table, YearRange,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Width of a runtime histogram bin, in minutes.
pub const RUNTIME_BIN_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy)]
struct Movie {
    title: &'static str,
    year: i64,
    genres: &'static [&'static str],
    runtime: i64,
    is_adult: bool,
    rating: f64,
    votes: i64,
}

const fn movie(
    title: &'static str,
    year: i64,
    genres: &'static [&'static str],
    runtime: i64,
    rating: f64,
    votes: i64,
) -> Movie {
    Movie {
        title,
        year,
        genres,
        runtime,
        is_adult: false,
        rating,
        votes,
    }
}

static CATALOGUE: [Movie; 20] = [
    movie("The Kid", 1921, &["Comedy", "Drama"], 68, 8.2, 132_000),
    movie("Metropolis", 1927, &["Drama", "Sci-Fi"], 153, 8.3, 185_000),
    movie("Casablanca", 1942, &["Drama", "Romance"], 102, 8.5, 610_000),
    movie("Rear Window", 1954, &["Mystery", "Thriller"], 112, 8.5, 520_000),
    movie("Psycho", 1960, &["Horror", "Thriller"], 109, 8.5, 720_000),
    movie("Alien", 1979, &["Horror", "Sci-Fi"], 117, 8.5, 960_000),
    movie("The Shining", 1980, &["Drama", "Horror"], 146, 8.4, 1_090_000),
    movie("Die Hard", 1988, &["Action", "Thriller"], 132, 8.2, 940_000),
    movie("Groundhog Day", 1993, &["Comedy", "Romance"], 101, 8.0, 680_000),
    movie("Pulp Fiction", 1994, &["Crime", "Drama"], 154, 8.9, 2_200_000),
    movie("Toy Story", 1995, &["Animation", "Comedy"], 81, 8.3, 1_050_000),
    movie("The Matrix", 1999, &["Action", "Sci-Fi"], 136, 8.7, 2_100_000),
    movie("Memento", 2000, &["Mystery", "Thriller"], 113, 8.4, 1_300_000),
    movie("Amelie", 2001, &["Comedy", "Romance"], 122, 8.3, 780_000),
    movie("Spirited Away", 2001, &["Animation", "Drama"], 125, 8.6, 850_000),
    movie("Oldboy", 2003, &["Action", "Drama"], 120, 8.3, 630_000),
    movie("Shaun of the Dead", 2004, &["Comedy", "Horror"], 99, 7.9, 580_000),
    movie("No Country for Old Men", 2007, &["Crime", "Thriller"], 122, 8.2, 1_050_000),
    movie("Inception", 2010, &["Action", "Sci-Fi"], 148, 8.8, 2_500_000),
    movie("Get Out", 2017, &["Horror", "Thriller"], 104, 7.8, 700_000),
];

/// In-memory warehouse over a fixed movie catalogue.
#[derive(Debug, Default)]
pub struct SampleWarehouse {
    offline: AtomicBool,
}

impl SampleWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every query fails with a source error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn movies(&self) -> std::slice::Iter<'static, Movie> {
        CATALOGUE.iter()
    }
}

fn in_genres(movie: &Movie, genres: &[String]) -> bool {
    genres.is_empty() || movie.genres.iter().any(|g| genres.iter().any(|s| s == g))
}

fn mean(sum: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn strings<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn ints(values: impl IntoIterator<Item = i64>) -> ArrayRef {
    Arc::new(Int64Array::from_iter_values(values))
}

fn floats(values: impl IntoIterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

fn batch(query: &str, columns: Vec<(&str, ArrayRef)>) -> Result<Table, FetchError> {
    RecordBatch::try_from_iter(columns).map_err(|e| FetchError::Source {
        query: query.to_string(),
        reason: e.to_string(),
    })
}

/// Count, rating sum, vote sum, runtime min/max.
#[derive(Debug, Default, Clone, Copy)]
struct Group {
    count: i64,
    rating_sum: f64,
    votes: i64,
    min_runtime: i64,
    max_runtime: i64,
}

impl Group {
    fn add(&mut self, movie: &Movie) {
        if self.count == 0 {
            self.min_runtime = movie.runtime;
            self.max_runtime = movie.runtime;
        }
        self.count += 1;
        self.rating_sum += movie.rating;
        self.votes += movie.votes;
        self.min_runtime = self.min_runtime.min(movie.runtime);
        self.max_runtime = self.max_runtime.max(movie.runtime);
    }

    fn average_rating(&self) -> f64 {
        mean(self.rating_sum, self.count)
    }
}

impl SampleWarehouse {
    fn top_movies(
        &self,
        year_range: &YearRange,
        genres: &[String],
        rating_range: &RatingRange,
        runtime_range: &RuntimeRange,
        limit: u32,
        min_votes: u32,
    ) -> Result<Table, FetchError> {
        let mut rows: Vec<&Movie> = self
            .movies()
            .filter(|m| year_range.contains(m.year as i32))
            .filter(|m| rating_range.contains(m.rating))
            .filter(|m| m.votes >= i64::from(min_votes))
            .filter(|m| runtime_range.contains(m.runtime))
            .filter(|m| in_genres(m, genres))
            .collect();
        rows.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| b.votes.cmp(&a.votes))
        });
        rows.truncate(limit as usize);

        batch(
            "top_movies",
            vec![
                ("movie_title", strings(rows.iter().map(|m| m.title))),
                ("release_year", ints(rows.iter().map(|m| m.year))),
                ("genres", strings(rows.iter().map(|m| m.genres.join(",")))),
                ("runtime_minutes", ints(rows.iter().map(|m| m.runtime))),
                (
                    "is_adult",
                    strings(rows.iter().map(|m| if m.is_adult { "Yes" } else { "No" })),
                ),
                ("average_rating", floats(rows.iter().map(|m| m.rating))),
                ("total_votes", ints(rows.iter().map(|m| m.votes))),
            ],
        )
    }

    fn genre_trends(&self, year_range: &YearRange, genres: &[String]) -> Result<Table, FetchError> {
        let mut groups: BTreeMap<(i64, &str), Group> = BTreeMap::new();
        for movie in self.movies().filter(|m| year_range.contains(m.year as i32)) {
            for genre in movie.genres {
                if genres.is_empty() || genres.iter().any(|g| g == genre) {
                    groups.entry((movie.year, *genre)).or_default().add(movie);
                }
            }
        }

        batch(
            "genre_trends",
            vec![
                ("release_year", ints(groups.keys().map(|k| k.0))),
                ("genre", strings(groups.keys().map(|k| k.1))),
                ("total_movies", ints(groups.values().map(|g| g.count))),
                ("average_rating", floats(groups.values().map(Group::average_rating))),
                ("total_votes", ints(groups.values().map(|g| g.votes))),
            ],
        )
    }

    fn runtime_distribution(&self, runtime_range: &RuntimeRange) -> Result<Table, FetchError> {
        let mut bins: BTreeMap<i64, Group> = BTreeMap::new();
        for movie in self.movies() {
            let start = movie.runtime.div_euclid(RUNTIME_BIN_MINUTES) * RUNTIME_BIN_MINUTES;
            bins.entry(start).or_default().add(movie);
        }
        // Whole bins only, matched on the runtimes they actually contain.
        bins.retain(|_, g| g.min_runtime >= runtime_range.low && g.max_runtime <= runtime_range.high);

        let label = |start: &i64| format!("{}-{}", start, start + RUNTIME_BIN_MINUTES - 1);
        batch(
            "runtime_distribution",
            vec![
                ("runtime_bin", strings(bins.keys().map(label))),
                ("total_movies", ints(bins.values().map(|g| g.count))),
                ("average_rating", floats(bins.values().map(Group::average_rating))),
                ("min_runtime", ints(bins.values().map(|g| g.min_runtime))),
                ("max_runtime", ints(bins.values().map(|g| g.max_runtime))),
            ],
        )
    }

    fn yearly_trends(&self, year_range: &YearRange) -> Result<Table, FetchError> {
        let mut years: BTreeMap<i64, Group> = BTreeMap::new();
        for movie in self.movies().filter(|m| year_range.contains(m.year as i32)) {
            years.entry(movie.year).or_default().add(movie);
        }

        batch(
            "yearly_trends",
            vec![
                ("release_year", ints(years.keys().copied())),
                ("total_movies", ints(years.values().map(|g| g.count))),
                ("average_rating", floats(years.values().map(Group::average_rating))),
            ],
        )
    }

    fn year_bounds(&self) -> Result<Table, FetchError> {
        let years = || self.movies().map(|m| m.year);
        batch(
            "year_range",
            vec![
                ("min_year", Arc::new(Int64Array::from(vec![years().min()])) as ArrayRef),
                ("max_year", Arc::new(Int64Array::from(vec![years().max()])) as ArrayRef),
            ],
        )
    }

    fn genre_catalog(&self) -> Result<Table, FetchError> {
        let genres: BTreeSet<&str> = self.movies().flat_map(|m| m.genres.iter().copied()).collect();
        batch(
            "unique_genres",
            vec![("genre", strings(genres))],
        )
    }
}

impl DataSource for SampleWarehouse {
    fn fetch_query(&self, request: &QueryRequest) -> Result<Table, FetchError> {
        if self.is_offline() {
            return Err(FetchError::Source {
                query: request.kind().name().to_string(),
                reason: "warehouse unreachable".to_string(),
            });
        }
        match request {
            QueryRequest::TopMovies {
                year_range,
                genres,
                rating_range,
                runtime_range,
                limit,
                min_votes,
            } => self.top_movies(year_range, genres, rating_range, runtime_range, *limit, *min_votes),
            QueryRequest::GenreTrends { year_range, genres } => self.genre_trends(year_range, genres),
            QueryRequest::RuntimeDistribution { runtime_range } => {
                self.runtime_distribution(runtime_range)
            }
            QueryRequest::YearlyTrends { year_range } => self.yearly_trends(year_range),
            QueryRequest::YearBounds => self.year_bounds(),
            QueryRequest::GenreCatalog => self.genre_catalog(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::Int64Type;

    fn top(year: (i32, i32), genres: &[&str], rating: (f64, f64)) -> QueryRequest {
        QueryRequest::TopMovies {
            year_range: YearRange::new(year.0, year.1),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating_range: RatingRange::new(rating.0, rating.1),
            runtime_range: RuntimeRange::new(0, 300),
            limit: 5,
            min_votes: 1000,
        }
    }

    #[test]
    fn test_top_movies_filters_and_limits() {
        let warehouse = SampleWarehouse::new();
        let table = warehouse.fetch_query(&top((1990, 2010), &[], (8.0, 10.0))).unwrap();
        assert_eq!(table.num_rows(), 5);
        let titles = table.column_by_name("movie_title").unwrap().as_string::<i32>();
        assert_eq!(titles.value(0), "Pulp Fiction");

        let horror = warehouse
            .fetch_query(&top((1894, 2025), &["Horror"], (0.0, 10.0)))
            .unwrap();
        assert_eq!(horror.num_rows(), 5);
    }

    #[test]
    fn test_narrow_filters_give_empty_table() {
        let warehouse = SampleWarehouse::new();
        let table = warehouse.fetch_query(&top((1894, 1900), &[], (0.0, 10.0))).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 7);
    }

    #[test]
    fn test_yearly_trends_grouped_by_year() {
        let warehouse = SampleWarehouse::new();
        let table = warehouse
            .fetch_query(&QueryRequest::YearlyTrends {
                year_range: YearRange::new(2000, 2001),
            })
            .unwrap();
        let counts = table.column_by_name("total_movies").unwrap().as_primitive::<Int64Type>();
        assert_eq!(counts.values().to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_runtime_bins_within_range() {
        let warehouse = SampleWarehouse::new();
        let table = warehouse
            .fetch_query(&QueryRequest::RuntimeDistribution {
                runtime_range: RuntimeRange::new(90, 149),
            })
            .unwrap();
        let bins = table.column_by_name("runtime_bin").unwrap().as_string::<i32>();
        assert_eq!(bins.iter().flatten().collect::<Vec<_>>(), vec!["90-119", "120-149"]);
    }

    #[test]
    fn test_reference_queries() {
        let warehouse = SampleWarehouse::new();
        let bounds = warehouse.fetch_query(&QueryRequest::YearBounds).unwrap();
        let min = bounds.column_by_name("min_year").unwrap().as_primitive::<Int64Type>();
        assert_eq!(min.value(0), 1921);

        let genres = warehouse.fetch_query(&QueryRequest::GenreCatalog).unwrap();
        let names = genres.column_by_name("genre").unwrap().as_string::<i32>();
        assert_eq!(names.value(0), "Action");
    }

    #[test]
    fn test_offline() {
        let warehouse = SampleWarehouse::new();
        warehouse.set_offline(true);
        assert!(warehouse.fetch_query(&QueryRequest::GenreCatalog).is_err());
        warehouse.set_offline(false);
        assert!(warehouse.fetch_query(&QueryRequest::GenreCatalog).is_ok());
    }
}
