//! Cinemetrics dashboard demo.
//!
//! Drives a scripted sequence of sidebar changes against the in-memory
//! sample warehouse and logs what every chart query did.

use std::error::Error;
use std::sync::Arc;

use cinemetrics_core::{DashboardConfig, FilterInput, QueryKind};
use cinemetrics_dashboard::{
    init_tracing, ChartView, CycleOutcome, Dashboard, RenderOutput, SampleWarehouse,
};
use cinemetrics_storage::ResultCache;

fn main() -> Result<(), Box<dyn Error>> {
    let config = DashboardConfig::load()?;
    init_tracing(&config.log)?;

    let warehouse = Arc::new(SampleWarehouse::new());
    let cache = Arc::new(ResultCache::new());
    let mut dashboard = Dashboard::new(config, Arc::clone(&warehouse), Arc::clone(&cache));

    log_cycle("initial load", &dashboard.on_load());
    log_renders(&dashboard.render_all());

    let initial = dashboard.initial_input();
    log_cycle("unchanged filters", &dashboard.on_filter_change(&initial));

    let narrowed = FilterInput {
        date_range: Some(vec![
            Some("2000-01-01".to_string()),
            Some("2010-12-31".to_string()),
        ]),
        genres: Some(vec![]),
        rating_range: Some(vec![7.0, 10.0]),
        runtime_range: Some(vec![0, 300]),
    };
    log_cycle("narrowed filters", &dashboard.on_filter_change(&narrowed));
    log_renders(&dashboard.render_all());

    let silent_era = FilterInput {
        date_range: Some(vec![
            Some("1894-01-01".to_string()),
            Some("1900-12-31".to_string()),
        ]),
        ..narrowed.clone()
    };
    log_cycle("filters with no matches", &dashboard.on_filter_change(&silent_era));

    warehouse.set_offline(true);
    let recent = FilterInput {
        date_range: Some(vec![
            Some("2015-01-01".to_string()),
            Some("2020-12-31".to_string()),
        ]),
        ..narrowed.clone()
    };
    log_cycle("warehouse offline", &dashboard.on_filter_change(&recent));
    log_renders(&dashboard.render_all());
    warehouse.set_offline(false);

    let half_edited = FilterInput {
        date_range: Some(vec![Some("2015-01-01".to_string()), None]),
        ..narrowed
    };
    log_cycle("half-edited dates", &dashboard.on_filter_change(&half_edited));

    dashboard.end_session();
    log_cycle("new session", &dashboard.on_load());

    let stats = cache.stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entry_count,
        hit_rate = stats.hit_rate(),
        "Result cache"
    );
    Ok(())
}

fn log_cycle(step: &str, outcomes: &[(QueryKind, CycleOutcome)]) {
    for (kind, outcome) in outcomes {
        tracing::info!(step, query = kind.name(), outcome = ?outcome, "Update cycle");
    }
}

fn log_renders(outputs: &[(QueryKind, RenderOutput)]) {
    for (kind, output) in outputs {
        match &output.view {
            ChartView::Chart { spec, table } => tracing::info!(
                query = kind.name(),
                chart = ?spec.kind,
                rows = table.num_rows(),
                "Rendered chart"
            ),
            ChartView::Placeholder { message } => {
                tracing::info!(query = kind.name(), message = %message, "Rendered placeholder")
            }
        }
    }
}
