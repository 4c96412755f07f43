//! The dashboard coordinator.
//!
//! Owns the four chart orchestrators, the reference-data loader and the
//! last view rendered per chart. Each query runs on its own; a failure in
//! one never touches another's packet.

use crate::orchestrator::{CycleOutcome, FetchOrchestrator};
use crate::reference::{ReferenceLoad, ReferenceLoader};
use crate::render::{render, ChartView, RenderOutput};
use crate::service::DataService;
use crate::store::ClientStorage;
use cinemetrics_core::{DashboardConfig, DataSource, FilterInput, QueryKind, Table};
use cinemetrics_storage::{CacheConfig, ReadThroughCache, ResultCache};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct Dashboard<W: DataSource> {
    config: DashboardConfig,
    service: Arc<DataService<W>>,
    storage: Arc<ClientStorage>,
    reference: ReferenceLoader<W>,
    orchestrators: Vec<FetchOrchestrator<DataService<W>>>,
    views: HashMap<QueryKind, ChartView>,
}

impl<W: DataSource> Dashboard<W> {
    /// Build a dashboard over `warehouse`, sharing `cache` with any other
    /// dashboard in the process.
    pub fn new(config: DashboardConfig, warehouse: W, cache: Arc<ResultCache<Table>>) -> Self {
        let service = Arc::new(
            DataService::new(warehouse)
                .with_cache(ReadThroughCache::new(
                    cache,
                    CacheConfig::from_settings(&config.cache),
                ))
                .with_settings(config.query.clone())
                .with_reference_defaults(config.reference.clone()),
        );
        Self::with_service(config, service, Arc::new(ClientStorage::new()))
    }

    /// Build a dashboard around an existing service and client store.
    pub fn with_service(
        config: DashboardConfig,
        service: Arc<DataService<W>>,
        storage: Arc<ClientStorage>,
    ) -> Self {
        let orchestrators = QueryKind::CHARTS
            .iter()
            .map(|&kind| {
                FetchOrchestrator::new(
                    kind,
                    Arc::clone(&service),
                    config.query.clone(),
                    Arc::clone(&storage),
                )
            })
            .collect();
        let reference = ReferenceLoader::new(
            Arc::clone(&service),
            Arc::clone(&storage),
            config.filters.clone(),
        );
        Self {
            config,
            service,
            storage,
            reference,
            orchestrators,
            views: HashMap::new(),
        }
    }

    /// Page load: fetch reference data if needed, then run every chart
    /// query for the initial sidebar values.
    pub fn on_load(&mut self) -> Vec<(QueryKind, CycleOutcome)> {
        let years = self.reference.load_year_range();
        let genres = self.reference.load_genres();
        info!(
            years_cached = years == ReferenceLoad::Cached,
            genres_cached = genres == ReferenceLoad::Cached,
            "Reference data ready"
        );
        let input = self.initial_input();
        self.on_filter_change(&input)
    }

    /// Sidebar values on first load: the slider spans the known years.
    pub fn initial_input(&self) -> FilterInput {
        let bounds = self.reference.year_slider_bounds();
        FilterInput {
            date_range: Some(vec![
                Some(format!("{:04}-01-01", bounds.low)),
                Some(format!("{:04}-01-01", bounds.high)),
            ]),
            ..self.config.filters.initial_input()
        }
    }

    /// Run one update cycle per chart query.
    pub fn on_filter_change(&self, input: &FilterInput) -> Vec<(QueryKind, CycleOutcome)> {
        self.orchestrators
            .iter()
            .map(|orchestrator| (orchestrator.kind(), orchestrator.run(input)))
            .collect()
    }

    /// Render every chart from its current packet.
    pub fn render_all(&mut self) -> Vec<(QueryKind, RenderOutput)> {
        QueryKind::CHARTS
            .iter()
            .map(|&kind| {
                let packet = self.storage.read_packet(kind);
                let output = render(kind, packet.as_ref(), self.views.get(&kind));
                self.views.insert(kind, output.view.clone());
                (kind, output)
            })
            .collect()
    }

    /// End the client session. Query packets and rendered views go;
    /// reference data stays.
    pub fn end_session(&mut self) {
        self.storage.end_session();
        self.views.clear();
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn service(&self) -> &DataService<W> {
        &self.service
    }

    pub fn storage(&self) -> &ClientStorage {
        &self.storage
    }

    pub fn reference(&self) -> &ReferenceLoader<W> {
        &self.reference
    }

    pub fn view(&self, kind: QueryKind) -> Option<&ChartView> {
        self.views.get(&kind)
    }
}
