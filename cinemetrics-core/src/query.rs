//! Dashboard queries and their cache identities

use crate::config::QuerySettings;
use crate::error::FilterError;
use crate::filter::{FilterInput, RatingRange, RuntimeRange, YearRange};
use crate::fingerprint::{Fingerprint, KeyArgs};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How quickly the data behind a query changes.
///
/// The class only names a policy; the concrete time-to-live comes from
/// cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Filter-parameterized results (12 hours by default).
    FrequentlyChanging,
    /// Reference data such as the year bounds and genre list (7 days by default).
    SlowlyChanging,
}

/// Every logical query the dashboard issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    TopMovies,
    GenreTrends,
    RuntimeDistribution,
    YearlyTrends,
    YearBounds,
    GenreCatalog,
}

impl QueryKind {
    /// The four chart queries, in page order.
    pub const CHARTS: [QueryKind; 4] = [
        QueryKind::TopMovies,
        QueryKind::GenreTrends,
        QueryKind::RuntimeDistribution,
        QueryKind::YearlyTrends,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TopMovies => "top_movies",
            Self::GenreTrends => "genre_trends",
            Self::RuntimeDistribution => "runtime_distribution",
            Self::YearlyTrends => "yearly_trends",
            Self::YearBounds => "year_range",
            Self::GenreCatalog => "unique_genres",
        }
    }

    /// Name of the data-service method that owns the server-side cache entry.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::TopMovies => "get_top_movies",
            Self::GenreTrends => "get_genre_trends",
            Self::RuntimeDistribution => "get_runtime_distribution",
            Self::YearlyTrends => "get_yearly_trends",
            Self::YearBounds => "get_year_range",
            Self::GenreCatalog => "get_unique_genres",
        }
    }

    /// Client storage slot holding this query's packet.
    pub fn slot(&self) -> &'static str {
        match self {
            Self::TopMovies => "top-movies-cache",
            Self::GenreTrends => "genre-trends-cache",
            Self::RuntimeDistribution => "runtime-distribution-cache",
            Self::YearlyTrends => "yearly-trends-cache",
            Self::YearBounds => "year-range-cache",
            Self::GenreCatalog => "genres-cache",
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Self::YearBounds | Self::GenreCatalog => TtlClass::SlowlyChanging,
            _ => TtlClass::FrequentlyChanging,
        }
    }

    pub fn is_reference_data(&self) -> bool {
        self.ttl_class() == TtlClass::SlowlyChanging
    }

    /// Build the request for this query from raw filter input.
    ///
    /// Only the filters the query actually uses are validated, so a
    /// half-edited date range does not block the runtime chart.
    pub fn request(
        &self,
        input: &FilterInput,
        settings: &QuerySettings,
    ) -> Result<QueryRequest, FilterError> {
        Ok(match self {
            Self::TopMovies => QueryRequest::TopMovies {
                year_range: input.year_range()?,
                genres: input.genres(),
                rating_range: input.rating_range()?,
                runtime_range: input.runtime_range()?,
                limit: settings.top_n_movies,
                min_votes: settings.min_votes_threshold,
            },
            Self::GenreTrends => QueryRequest::GenreTrends {
                year_range: input.year_range()?,
                genres: input.genres(),
            },
            Self::RuntimeDistribution => QueryRequest::RuntimeDistribution {
                runtime_range: input.runtime_range()?,
            },
            Self::YearlyTrends => QueryRequest::YearlyTrends {
                year_range: input.year_range()?,
            },
            Self::YearBounds => QueryRequest::YearBounds,
            Self::GenreCatalog => QueryRequest::GenreCatalog,
        })
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete, validated query against the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum QueryRequest {
    TopMovies {
        year_range: YearRange,
        genres: Vec<String>,
        rating_range: RatingRange,
        runtime_range: RuntimeRange,
        limit: u32,
        min_votes: u32,
    },
    GenreTrends {
        year_range: YearRange,
        genres: Vec<String>,
    },
    RuntimeDistribution {
        runtime_range: RuntimeRange,
    },
    YearlyTrends {
        year_range: YearRange,
    },
    YearBounds,
    GenreCatalog,
}

impl QueryRequest {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::TopMovies { .. } => QueryKind::TopMovies,
            Self::GenreTrends { .. } => QueryKind::GenreTrends,
            Self::RuntimeDistribution { .. } => QueryKind::RuntimeDistribution,
            Self::YearlyTrends { .. } => QueryKind::YearlyTrends,
            Self::YearBounds => QueryKind::YearBounds,
            Self::GenreCatalog => QueryKind::GenreCatalog,
        }
    }

    /// Arguments for the client-held fingerprint: the filter values only.
    ///
    /// The genre selection is a set; picking the same genres in another
    /// order gives the same key.
    pub fn filter_key_args(&self) -> KeyArgs {
        match self {
            Self::TopMovies {
                year_range,
                genres,
                rating_range,
                runtime_range,
                ..
            } => KeyArgs::new()
                .arg(year_range)
                .arg_unordered(genres)
                .arg(rating_range)
                .arg(runtime_range),
            Self::GenreTrends { year_range, genres } => {
                KeyArgs::new().arg(year_range).arg_unordered(genres)
            }
            Self::RuntimeDistribution { runtime_range } => KeyArgs::new().arg(runtime_range),
            Self::YearlyTrends { year_range } => KeyArgs::new().arg(year_range),
            Self::YearBounds | Self::GenreCatalog => KeyArgs::new(),
        }
    }

    /// Arguments for the server-side cache key: filters plus any query
    /// settings that change the result.
    pub fn service_key_args(&self) -> KeyArgs {
        match self {
            Self::TopMovies {
                limit, min_votes, ..
            } => self.filter_key_args().arg(limit).arg(min_votes),
            _ => self.filter_key_args(),
        }
    }

    /// Fingerprint compared against the client-held packet.
    pub fn fingerprint(&self) -> Fingerprint {
        self.filter_key_args().fingerprint()
    }
}
