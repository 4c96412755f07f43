//! Cinemetrics Dashboard - Client Tier and Orchestration
//!
//! Everything between a sidebar filter change and a rendered chart:
//!
//! - [`packet`]: the client-held `{fingerprint, payload, error}` packet
//! - [`gate`]: the stale-vs-fresh decision protocol
//! - [`orchestrator`]: one fetch cycle per chart query
//! - [`service`]: the cached data service in front of the warehouse
//! - [`store`]: session and local client storage slots
//! - [`reference`]: year bounds and genre list for the sidebar
//! - [`render`]: packet to chart view
//! - [`dashboard`]: ties the four chart queries together
//!
//! [`sample`] provides an in-memory warehouse for the demo binary and tests.

pub mod dashboard;
pub mod gate;
pub mod orchestrator;
pub mod packet;
pub mod reference;
pub mod render;
pub mod sample;
pub mod service;
pub mod store;
pub mod telemetry;

pub use dashboard::Dashboard;
pub use gate::{FetchOutcome, FreshnessGate, GateDecision};
pub use orchestrator::{CycleOutcome, FetchOrchestrator};
pub use packet::{ClientCachePacket, PacketState, NO_DATA};
pub use reference::{GenreOption, GenresPacket, ReferenceLoad, ReferenceLoader, YearBoundsPacket};
pub use render::{render, ChartKind, ChartSpec, ChartView, RenderOutput, ERROR_PLACEHOLDER, LOADING};
pub use sample::SampleWarehouse;
pub use service::DataService;
pub use store::{ClientStorage, Durability};
pub use telemetry::{init_tracing, TelemetryError};
