//! Error types for Cinemetrics operations

use thiserror::Error;

/// Filter validation errors.
///
/// These never reach the cache layer: a request whose filters fail
/// validation is dropped before a fingerprint is derived.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Required filter missing: {field}")]
    MissingField { field: String },

    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    #[error("Invalid range for {field}: {reason}")]
    InvalidRange { field: String, reason: String },
}

/// Columnar codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported column type for {column}: {data_type}")]
    UnsupportedColumn { column: String, data_type: String },

    #[error("Malformed envelope: {reason}")]
    Envelope { reason: String },

    #[error("Unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("Payload integrity check failed: {reason}")]
    Integrity { reason: String },

    #[error("IPC error: {reason}")]
    Ipc { reason: String },
}

/// Data source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Query {query} failed: {reason}")]
    Source { query: String, reason: String },

    #[error("Query {query} timed out after {elapsed_ms}ms")]
    Timeout { query: String, elapsed_ms: u64 },

    #[error("Query {query} returned no column {column}")]
    MissingColumn { query: String, column: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Cinemetrics errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CinemetricsError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Cinemetrics operations.
pub type CinemetricsResult<T> = Result<T, CinemetricsError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::InvalidDateRange {
            reason: "start year 2010 is after end year 2000".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid date range"));
        assert!(msg.contains("2010"));
    }

    #[test]
    fn test_codec_error_version_display() {
        let err = CodecError::UnsupportedVersion {
            found: 9,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported format version 9 (expected 1)"
        );
    }

    #[test]
    fn test_fetch_error_converts_to_master() {
        let err: CinemetricsError = FetchError::Timeout {
            query: "top_movies".to_string(),
            elapsed_ms: 30_000,
        }
        .into();
        assert!(matches!(err, CinemetricsError::Fetch(_)));
        assert!(err.to_string().contains("timed out after 30000ms"));
    }

    #[test]
    fn test_codec_and_fetch_errors_are_distinguishable() {
        let codec: CinemetricsError = CodecError::Envelope {
            reason: "bad magic".to_string(),
        }
        .into();
        let fetch: CinemetricsError = FetchError::Source {
            query: "yearly_trends".to_string(),
            reason: "bad magic".to_string(),
        }
        .into();
        assert_ne!(codec, fetch);
    }
}
