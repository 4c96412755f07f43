//! Per-query fetch orchestration.
//!
//! One [`FetchOrchestrator`] per chart query. A run validates the filters
//! the query uses, derives the fingerprint, asks the gate whether a fetch is
//! needed, fetches and encodes, and stores whatever packet the gate
//! resolves to. Nothing that goes wrong here escapes as an error; it ends up
//! in the returned [`CycleOutcome`] and the log.

use crate::gate::{FetchOutcome, FreshnessGate, GateDecision};
use crate::store::ClientStorage;
use cinemetrics_core::{DataSource, FilterError, FilterInput, QueryKind, QuerySettings};
use std::sync::Arc;
use tracing::{error, info};

/// What one update cycle did to a query's packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Filters failed validation; nothing changed.
    InvalidFilters(FilterError),
    /// The held packet already matches the filters; no fetch was made.
    UpToDate,
    /// A fresh payload was stored.
    Stored,
    /// An error packet was stored because there was nothing to fall back on.
    ErrorStored(String),
    /// The result was empty and the previous payload was kept.
    Retained,
    /// The fetch failed and the previous payload was kept.
    RetainedAfterError(String),
}

impl CycleOutcome {
    /// Whether a fetch was attempted.
    pub fn fetched(&self) -> bool {
        !matches!(self, CycleOutcome::InvalidFilters(_) | CycleOutcome::UpToDate)
    }
}

/// Binds one chart query to its source, gate and storage slot.
pub struct FetchOrchestrator<S: DataSource> {
    kind: QueryKind,
    source: Arc<S>,
    settings: QuerySettings,
    gate: FreshnessGate,
    storage: Arc<ClientStorage>,
}

impl<S: DataSource> FetchOrchestrator<S> {
    pub fn new(
        kind: QueryKind,
        source: Arc<S>,
        settings: QuerySettings,
        storage: Arc<ClientStorage>,
    ) -> Self {
        Self {
            kind,
            source,
            settings,
            gate: FreshnessGate::new(),
            storage,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Run one update cycle for `input`.
    pub fn run(&self, input: &FilterInput) -> CycleOutcome {
        let kind = self.kind;
        let request = match kind.request(input, &self.settings) {
            Ok(request) => request,
            Err(e) => {
                info!(query = kind.name(), reason = %e, "Skipping update for invalid filters");
                return CycleOutcome::InvalidFilters(e);
            }
        };
        let fingerprint = request.fingerprint();
        let held = self.storage.read_packet(kind);

        if self.gate.admit(&fingerprint, held.as_ref()).is_skip() {
            info!(query = kind.name(), fingerprint = fingerprint.short(), "Using cached data");
            return CycleOutcome::UpToDate;
        }

        info!(query = kind.name(), fingerprint = fingerprint.short(), "Fetching data");
        let outcome = match self.source.fetch_query(&request) {
            Ok(table) if table.num_rows() == 0 => FetchOutcome::Empty,
            Ok(table) => match cinemetrics_codec::encode(&table) {
                Ok(payload) => FetchOutcome::Rows(payload),
                Err(e) => {
                    error!(query = kind.name(), error = %e, "Error encoding result");
                    FetchOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                error!(query = kind.name(), error = %e, "Error fetching data");
                FetchOutcome::Failed(e.to_string())
            }
        };

        match self.gate.resolve(&fingerprint, held.as_ref(), outcome) {
            GateDecision::Skip => CycleOutcome::Retained,
            GateDecision::Fail(reason) => CycleOutcome::RetainedAfterError(reason),
            GateDecision::Proceed(packet) => {
                if let Err(e) = self.storage.write_packet(kind, &packet) {
                    error!(query = kind.name(), error = %e, "Error storing packet");
                    return CycleOutcome::RetainedAfterError(e.to_string());
                }
                match packet.error {
                    Some(reason) => CycleOutcome::ErrorStored(reason),
                    None => CycleOutcome::Stored,
                }
            }
        }
    }
}
