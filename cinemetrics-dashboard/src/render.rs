//! The render stage.
//!
//! Rendering is a pure function of the current packet. No packet shows
//! "Loading...", an error without payload shows the error placeholder, and
//! a packet with neither shows "No data available". A payload is decoded
//! and bound to its chart; a failure there keeps the previous view.

use crate::packet::{ClientCachePacket, NO_DATA};
use cinemetrics_core::{QueryKind, Table};
use tracing::{error, warn};

pub const LOADING: &str = "Loading...";
pub const ERROR_PLACEHOLDER: &str = "Error rendering chart";

/// Chart families used on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Horizontal bars.
    Bar,
    /// Stacked areas, one per color group.
    Area,
    /// Bars with a line on a second axis.
    Combo,
    /// Two lines on separate y axes.
    DualAxisLine,
}

/// Column bindings for one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub query: QueryKind,
    pub kind: ChartKind,
    pub title: &'static str,
    pub x: &'static str,
    pub y: &'static str,
    /// Second series: the line in a combo, the right axis in a dual-axis line.
    pub secondary: Option<&'static str>,
    pub color: Option<&'static str>,
    pub hover: &'static [&'static str],
}

static TOP_MOVIES: ChartSpec = ChartSpec {
    query: QueryKind::TopMovies,
    kind: ChartKind::Bar,
    title: "Top Rated Movies",
    x: "average_rating",
    y: "movie_title",
    secondary: None,
    color: Some("total_votes"),
    hover: &[
        "average_rating",
        "total_votes",
        "genres",
        "release_year",
        "runtime_minutes",
        "is_adult",
    ],
};

static GENRE_TRENDS: ChartSpec = ChartSpec {
    query: QueryKind::GenreTrends,
    kind: ChartKind::Area,
    title: "Genre Trends Over Time",
    x: "release_year",
    y: "total_movies",
    secondary: None,
    color: Some("genre"),
    hover: &["total_movies", "average_rating", "total_votes"],
};

static RUNTIME_DISTRIBUTION: ChartSpec = ChartSpec {
    query: QueryKind::RuntimeDistribution,
    kind: ChartKind::Combo,
    title: "Runtime Distribution",
    x: "runtime_bin",
    y: "total_movies",
    secondary: Some("average_rating"),
    color: None,
    hover: &["min_runtime", "max_runtime"],
};

static YEARLY_TRENDS: ChartSpec = ChartSpec {
    query: QueryKind::YearlyTrends,
    kind: ChartKind::DualAxisLine,
    title: "Yearly Trends",
    x: "release_year",
    y: "total_movies",
    secondary: Some("average_rating"),
    color: None,
    hover: &[],
};

impl ChartSpec {
    /// The chart for a dashboard query; reference queries have none.
    pub fn for_query(query: QueryKind) -> Option<&'static ChartSpec> {
        match query {
            QueryKind::TopMovies => Some(&TOP_MOVIES),
            QueryKind::GenreTrends => Some(&GENRE_TRENDS),
            QueryKind::RuntimeDistribution => Some(&RUNTIME_DISTRIBUTION),
            QueryKind::YearlyTrends => Some(&YEARLY_TRENDS),
            QueryKind::YearBounds | QueryKind::GenreCatalog => None,
        }
    }

    /// Every column the chart reads, without duplicates.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.x, self.y];
        columns.extend(self.secondary);
        columns.extend(self.color);
        columns.extend(self.hover.iter().copied());
        let mut seen = Vec::with_capacity(columns.len());
        for column in columns {
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        seen
    }

    /// First bound column missing from `table`, if any.
    pub fn missing_column(&self, table: &Table) -> Option<&'static str> {
        self.required_columns()
            .into_iter()
            .find(|column| table.column_by_name(column).is_none())
    }
}

/// What a chart slot shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    Placeholder { message: String },
    Chart { spec: &'static ChartSpec, table: Table },
}

impl ChartView {
    pub fn placeholder(message: impl Into<String>) -> Self {
        ChartView::Placeholder {
            message: message.into(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ChartView::Placeholder { message } => Some(message),
            ChartView::Chart { .. } => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            ChartView::Chart { table, .. } => Some(table),
            ChartView::Placeholder { .. } => None,
        }
    }
}

/// A rendered slot plus its loading indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub view: ChartView,
    pub loading: bool,
}

/// Render the slot for `query` from its current packet.
pub fn render(
    query: QueryKind,
    packet: Option<&ClientCachePacket>,
    previous: Option<&ChartView>,
) -> RenderOutput {
    let Some(spec) = ChartSpec::for_query(query) else {
        return RenderOutput {
            view: ChartView::placeholder(ERROR_PLACEHOLDER),
            loading: false,
        };
    };

    let Some(packet) = packet else {
        return RenderOutput {
            view: ChartView::placeholder(LOADING),
            loading: true,
        };
    };

    let view = match (&packet.payload, &packet.error) {
        (Some(payload), _) if !payload.is_empty() => match payload.decode() {
            Ok(table) => match spec.missing_column(&table) {
                None => Some(ChartView::Chart { spec, table }),
                Some(column) => {
                    error!(query = query.name(), column, "Error rendering chart: column missing");
                    None
                }
            },
            Err(e) => {
                error!(query = query.name(), error = %e, "Error rendering chart");
                None
            }
        },
        // An error without data covers the no-rows marker as well.
        (_, Some(reason)) => {
            warn!(query = query.name(), error = %reason, "Rendering empty chart due to error");
            Some(ChartView::placeholder(ERROR_PLACEHOLDER))
        }
        _ => Some(ChartView::placeholder(NO_DATA)),
    };

    let view = view.unwrap_or_else(|| {
        previous
            .cloned()
            .unwrap_or_else(|| ChartView::placeholder(ERROR_PLACEHOLDER))
    });
    RenderOutput {
        view,
        loading: false,
    }
}
