//! Configuration types
//!
//! Loaded from a TOML file, then overridden from `CINEMETRICS_*`
//! environment variables, then validated. Every section has defaults so a
//! missing file still yields a working dashboard.

use crate::error::ConfigError;
use crate::filter::{FilterInput, YearRange};
use crate::query::TtlClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CINEMETRICS_CONFIG";

/// Query parameters that are not user filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySettings {
    pub top_n_movies: u32,
    pub min_votes_threshold: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            top_n_movies: 20,
            min_votes_threshold: 1000,
        }
    }
}

/// Initial widget values and slider bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterDefaults {
    pub min_year: i32,
    pub max_year: i32,
    pub genres: Vec<String>,
    pub min_rating: f64,
    pub max_rating: f64,
    pub runtime_min: i64,
    pub runtime_max: i64,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            min_year: 1894,
            max_year: 2025,
            genres: ["Action", "Comedy", "Drama", "Thriller", "Horror"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_rating: 0.0,
            max_rating: 10.0,
            runtime_min: 0,
            runtime_max: 300,
        }
    }
}

impl FilterDefaults {
    pub fn year_bounds(&self) -> YearRange {
        YearRange::new(self.min_year, self.max_year)
    }

    /// Filter input as the sidebar reports it on first load.
    pub fn initial_input(&self) -> FilterInput {
        FilterInput {
            date_range: Some(vec![
                Some(format!("{:04}-01-01", self.min_year)),
                Some(format!("{:04}-01-01", self.max_year)),
            ]),
            genres: Some(self.genres.clone()),
            rating_range: Some(vec![self.min_rating, self.max_rating]),
            runtime_range: Some(vec![self.runtime_min, self.runtime_max]),
        }
    }
}

/// Server-side result cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub enabled: bool,
    /// TTL for filter-parameterized results, in seconds.
    pub frequent_ttl_secs: u64,
    /// TTL for reference data, in seconds.
    pub slow_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frequent_ttl_secs: 60 * 60 * 12,
            slow_ttl_secs: 60 * 60 * 24 * 7,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::FrequentlyChanging => Duration::from_secs(self.frequent_ttl_secs),
            TtlClass::SlowlyChanging => Duration::from_secs(self.slow_ttl_secs),
        }
    }
}

/// Values used when reference data cannot be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceDefaults {
    pub fallback_min_year: i32,
    pub fallback_max_year: i32,
}

impl Default for ReferenceDefaults {
    fn default() -> Self {
        Self {
            fallback_min_year: 1900,
            fallback_max_year: 2025,
        }
    }
}

impl ReferenceDefaults {
    pub fn fallback_year_range(&self) -> YearRange {
        YearRange::new(self.fallback_min_year, self.fallback_max_year)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    /// Forces `debug` level regardless of `level`.
    pub debug: bool,
    /// Also append plain-text logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            debug: false,
            file: None,
        }
    }
}

impl LogSettings {
    pub fn effective_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.level
        }
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub query: QuerySettings,
    pub filters: FilterDefaults,
    pub cache: CacheSettings,
    pub reference: ReferenceDefaults,
    pub log: LogSettings,
}

impl DashboardConfig {
    /// Resolve, read, override and validate the configuration.
    ///
    /// The file path comes from `--config <path>` or `CINEMETRICS_CONFIG`;
    /// without either, defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Apply `CINEMETRICS_*` environment overrides.
    ///
    /// Environment variables:
    /// - `CINEMETRICS_DEBUG`: "true" or "1" forces debug logging
    /// - `CINEMETRICS_TOP_N`: number of top movies to fetch
    /// - `CINEMETRICS_MIN_VOTES`: minimum vote count for top movies
    /// - `CINEMETRICS_CACHE_ENABLED`: "true"/"false"
    /// - `CINEMETRICS_FCD_TTL_SECS`: TTL for frequently-changing data
    /// - `CINEMETRICS_SCD_TTL_SECS`: TTL for slowly-changing data
    /// - `CINEMETRICS_LOG_FILE`: path of the log file
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// ignored and the current value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(debug) = lookup("CINEMETRICS_DEBUG") {
            self.log.debug = parse_flag(&debug);
        }
        if let Some(n) = lookup("CINEMETRICS_TOP_N").and_then(|s| s.parse().ok()) {
            self.query.top_n_movies = n;
        }
        if let Some(n) = lookup("CINEMETRICS_MIN_VOTES").and_then(|s| s.parse().ok()) {
            self.query.min_votes_threshold = n;
        }
        if let Some(enabled) = lookup("CINEMETRICS_CACHE_ENABLED") {
            self.cache.enabled = parse_flag(&enabled);
        }
        if let Some(secs) = lookup("CINEMETRICS_FCD_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.cache.frequent_ttl_secs = secs;
        }
        if let Some(secs) = lookup("CINEMETRICS_SCD_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.cache.slow_ttl_secs = secs;
        }
        if let Some(path) = lookup("CINEMETRICS_LOG_FILE").filter(|p| !p.is_empty()) {
            self.log.file = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - top_n_movies > 0
    /// - both TTLs > 0
    /// - year, rating and runtime bounds are ordered
    /// - the log level is a known tracing level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.top_n_movies == 0 {
            return Err(invalid("query.top_n_movies", "0", "must be > 0"));
        }
        if self.cache.frequent_ttl_secs == 0 {
            return Err(invalid("cache.frequent_ttl_secs", "0", "must be > 0"));
        }
        if self.cache.slow_ttl_secs == 0 {
            return Err(invalid("cache.slow_ttl_secs", "0", "must be > 0"));
        }
        if self.filters.min_year > self.filters.max_year {
            return Err(invalid(
                "filters.min_year",
                &self.filters.min_year.to_string(),
                "must be <= filters.max_year",
            ));
        }
        if !(self.filters.min_rating <= self.filters.max_rating) {
            return Err(invalid(
                "filters.min_rating",
                &self.filters.min_rating.to_string(),
                "must be <= filters.max_rating",
            ));
        }
        if self.filters.runtime_min > self.filters.runtime_max {
            return Err(invalid(
                "filters.runtime_min",
                &self.filters.runtime_min.to_string(),
                "must be <= filters.runtime_max",
            ));
        }
        if self.reference.fallback_min_year > self.reference.fallback_max_year {
            return Err(invalid(
                "reference.fallback_min_year",
                &self.reference.fallback_min_year.to_string(),
                "must be <= reference.fallback_max_year",
            ));
        }
        let level = self.log.level.to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(invalid(
                "log.level",
                &self.log.level,
                "must be one of trace, debug, info, warn, error",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1")
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
