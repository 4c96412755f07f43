//! Dashboard filter values and their validation
//!
//! The sidebar hands over raw values ([`FilterInput`]): two date strings for
//! the year range, a genre list, and two numeric sliders. Validation turns
//! them into typed ranges. Anything that fails here aborts the current
//! update cycle before a fingerprint is ever derived.

use crate::error::FilterError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})").expect("Invalid year prefix regex"));

/// Closed interval `[low, high]`.
///
/// Serializes as a two-element array so that fingerprints match the shape
/// the sidebar sends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange<T> {
    pub low: T,
    pub high: T,
}

impl<T> ValueRange<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }
}

impl<T: PartialOrd + Copy> ValueRange<T> {
    pub fn contains(&self, value: T) -> bool {
        self.low <= value && value <= self.high
    }
}

impl<T: Serialize> Serialize for ValueRange<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [&self.low, &self.high].serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ValueRange<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [low, high] = <[T; 2]>::deserialize(deserializer)?;
        Ok(Self { low, high })
    }
}

/// Release-year interval.
pub type YearRange = ValueRange<i32>;
/// Average-rating interval.
pub type RatingRange = ValueRange<f64>;
/// Runtime interval in minutes.
pub type RuntimeRange = ValueRange<i64>;

/// Raw filter values as the sidebar widgets report them.
///
/// Every field is optional because widgets report nothing while they are
/// still initialising.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterInput {
    /// Two ISO-ish date strings, e.g. `["2000-01-01", "2010-01-01"]`.
    pub date_range: Option<Vec<Option<String>>>,
    pub genres: Option<Vec<String>>,
    pub rating_range: Option<Vec<f64>>,
    pub runtime_range: Option<Vec<i64>>,
}

impl FilterInput {
    /// Build raw input equivalent to an already validated filter set.
    pub fn from_filter_set(filters: &FilterSet) -> Self {
        Self {
            date_range: Some(vec![
                Some(format!("{:04}-01-01", filters.year_range.low)),
                Some(format!("{:04}-01-01", filters.year_range.high)),
            ]),
            genres: Some(filters.genres.clone()),
            rating_range: Some(vec![filters.rating_range.low, filters.rating_range.high]),
            runtime_range: Some(vec![filters.runtime_range.low, filters.runtime_range.high]),
        }
    }

    pub fn year_range(&self) -> Result<YearRange, FilterError> {
        let dates = self
            .date_range
            .as_deref()
            .ok_or_else(|| FilterError::MissingField {
                field: "date_range".to_string(),
            })?;
        parse_year_range(dates)
    }

    /// Selected genres; nothing selected means "all genres".
    pub fn genres(&self) -> Vec<String> {
        self.genres.clone().unwrap_or_default()
    }

    pub fn rating_range(&self) -> Result<RatingRange, FilterError> {
        let values = pair("rating_range", self.rating_range.as_deref())?;
        if !values[0].is_finite() || !values[1].is_finite() {
            return Err(FilterError::InvalidRange {
                field: "rating_range".to_string(),
                reason: "bounds must be finite".to_string(),
            });
        }
        ordered("rating_range", values[0], values[1])
    }

    pub fn runtime_range(&self) -> Result<RuntimeRange, FilterError> {
        let values = pair("runtime_range", self.runtime_range.as_deref())?;
        ordered("runtime_range", values[0], values[1])
    }
}

/// Fully validated filter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub year_range: YearRange,
    pub genres: Vec<String>,
    pub rating_range: RatingRange,
    pub runtime_range: RuntimeRange,
}

impl TryFrom<&FilterInput> for FilterSet {
    type Error = FilterError;

    fn try_from(input: &FilterInput) -> Result<Self, Self::Error> {
        Ok(Self {
            year_range: input.year_range()?,
            genres: input.genres(),
            rating_range: input.rating_range()?,
            runtime_range: input.runtime_range()?,
        })
    }
}

/// Parse a two-element date range into a year interval.
///
/// Only the leading four digits of each date are read. Rejects missing or
/// empty endpoints, malformed dates, and ranges that run backwards.
pub fn parse_year_range(dates: &[Option<String>]) -> Result<YearRange, FilterError> {
    if dates.len() != 2 {
        return Err(FilterError::InvalidDateRange {
            reason: format!("expected 2 dates, got {}", dates.len()),
        });
    }

    let mut years = [0i32; 2];
    for (slot, date) in years.iter_mut().zip(dates) {
        let date = match date.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => {
                return Err(FilterError::InvalidDateRange {
                    reason: "date range is incomplete".to_string(),
                })
            }
        };
        *slot = YEAR_PREFIX
            .captures(date)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| FilterError::InvalidDateRange {
                reason: format!("malformed date '{date}'"),
            })?;
    }

    if years[0] > years[1] {
        return Err(FilterError::InvalidDateRange {
            reason: format!("start year {} is after end year {}", years[0], years[1]),
        });
    }
    Ok(YearRange::new(years[0], years[1]))
}

fn pair<T: Copy>(field: &str, values: Option<&[T]>) -> Result<[T; 2], FilterError> {
    match values {
        None => Err(FilterError::MissingField {
            field: field.to_string(),
        }),
        Some([low, high]) => Ok([*low, *high]),
        Some(other) => Err(FilterError::InvalidRange {
            field: field.to_string(),
            reason: format!("expected 2 bounds, got {}", other.len()),
        }),
    }
}

fn ordered<T: PartialOrd + Copy + std::fmt::Display>(
    field: &str,
    low: T,
    high: T,
) -> Result<ValueRange<T>, FilterError> {
    if low > high {
        return Err(FilterError::InvalidRange {
            field: field.to_string(),
            reason: format!("lower bound {low} exceeds upper bound {high}"),
        });
    }
    Ok(ValueRange::new(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(a: &str, b: &str) -> Vec<Option<String>> {
        vec![Some(a.to_string()), Some(b.to_string())]
    }

    #[test]
    fn test_parse_year_range_reads_leading_year() {
        let range = parse_year_range(&dates("2000-01-01", "2010-06-30T00:00:00")).unwrap();
        assert_eq!(range, YearRange::new(2000, 2010));
    }

    #[test]
    fn test_parse_year_range_rejects_incomplete() {
        assert!(parse_year_range(&[]).is_err());
        assert!(parse_year_range(&dates("2000-01-01", "")).is_err());
        assert!(parse_year_range(&[Some("2000-01-01".to_string()), None]).is_err());
        let mut three = dates("2000-01-01", "2001-01-01");
        three.push(Some("2002-01-01".to_string()));
        assert!(parse_year_range(&three).is_err());
    }

    #[test]
    fn test_parse_year_range_rejects_malformed_and_backwards() {
        assert!(matches!(
            parse_year_range(&dates("20x0-01-01", "2010-01-01")),
            Err(FilterError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            parse_year_range(&dates("2011-01-01", "2010-01-01")),
            Err(FilterError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_single_year_range_is_valid() {
        let range = parse_year_range(&dates("1999-01-01", "1999-12-31")).unwrap();
        assert_eq!(range.low, range.high);
    }

    #[test]
    fn test_filter_set_from_input() {
        let input = FilterInput {
            date_range: Some(dates("2000-01-01", "2010-01-01")),
            genres: None,
            rating_range: Some(vec![7.0, 10.0]),
            runtime_range: Some(vec![0, 300]),
        };
        let filters = FilterSet::try_from(&input).unwrap();
        assert_eq!(filters.year_range, YearRange::new(2000, 2010));
        assert!(filters.genres.is_empty());
        assert_eq!(filters.rating_range, RatingRange::new(7.0, 10.0));
        assert_eq!(filters.runtime_range, RuntimeRange::new(0, 300));

        assert_eq!(FilterInput::from_filter_set(&filters).year_range(), Ok(filters.year_range));
    }

    #[test]
    fn test_range_validation() {
        let mut input = FilterInput {
            rating_range: Some(vec![9.0, 3.0]),
            runtime_range: Some(vec![0, 300, 400]),
            ..Default::default()
        };
        assert!(matches!(
            input.rating_range(),
            Err(FilterError::InvalidRange { .. })
        ));
        assert!(matches!(
            input.runtime_range(),
            Err(FilterError::InvalidRange { .. })
        ));

        input.rating_range = Some(vec![f64::NAN, 3.0]);
        assert!(input.rating_range().is_err());

        input.rating_range = None;
        assert_eq!(
            input.rating_range(),
            Err(FilterError::MissingField {
                field: "rating_range".to_string()
            })
        );
    }

    #[test]
    fn test_value_range_serializes_as_pair() {
        let range = YearRange::new(2000, 2010);
        assert_eq!(serde_json::to_string(&range).unwrap(), "[2000,2010]");
        let back: YearRange = serde_json::from_str("[2000,2010]").unwrap();
        assert_eq!(back, range);
        assert!(range.contains(2005));
        assert!(!range.contains(2011));
    }
}
