//! Tracing subscriber setup.
//!
//! Logs go to the console, plain or JSON, and optionally to an append-only
//! file as well.

use cinemetrics_core::LogSettings;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt::{
    self,
    format::{DefaultFields, Format},
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to open log file {path}: {reason}")]
    LogFile { path: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Layer writing plain-text events to a file.
pub type FileLayer<S> = fmt::Layer<S, DefaultFields, Format, Mutex<File>>;

/// Filter directives: `RUST_LOG` if set, otherwise the configured level.
pub fn env_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.effective_level()))
}

/// Open `path` for appending and wrap it in a fmt layer without colors.
pub fn file_layer<S>(path: &Path) -> Result<FileLayer<S>, TelemetryError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TelemetryError::LogFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
}

/// Install the global subscriber.
///
/// Call once at startup; a second call returns an error and leaves the
/// first subscriber in place.
pub fn init_tracing(settings: &LogSettings) -> Result<(), TelemetryError> {
    let json = settings.json;
    let file = settings
        .file
        .as_deref()
        .map(|path| file_layer(path))
        .transpose()?;

    tracing_subscriber::registry()
        .with(env_filter(settings))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(file)
        .try_init()?;

    tracing::info!(
        level = settings.effective_level(),
        json,
        file = ?settings.file,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn test_second_init_fails() {
        let settings = LogSettings::default();
        // Another test may have installed a subscriber first; either way the
        // second call must fail.
        let _ = init_tracing(&settings);
        assert!(matches!(
            init_tracing(&settings),
            Err(TelemetryError::Init(_))
        ));
    }

    #[test]
    fn test_debug_flag_wins() {
        let settings = LogSettings {
            level: "warn".to_string(),
            debug: true,
            ..LogSettings::default()
        };
        assert_eq!(settings.effective_level(), "debug");
        let _ = env_filter(&settings);
    }

    #[test]
    fn test_file_layer_appends_events() {
        let path = std::env::temp_dir().join(format!(
            "cinemetrics-telemetry-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let subscriber = Registry::default().with(file_layer(&path).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(query = "top_movies", "Using cached data");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(written.contains("Using cached data"), "{written}");
        assert!(written.contains("query=\"top_movies\""), "{written}");
        assert!(!written.contains('\u{1b}'), "no ANSI escapes in the file");
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = std::env::temp_dir();
        // A directory cannot be opened for appending.
        let result = file_layer::<Registry>(&dir);
        assert!(matches!(result, Err(TelemetryError::LogFile { .. })));
    }
}
