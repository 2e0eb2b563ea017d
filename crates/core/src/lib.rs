//! # Quill Core
//!
//! Telemetry aggregation and blog business logic with no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - The telemetry store: counter registry, histogram estimator, span
//!   buffer, ingestion pipeline and render surface
//! - The in-process instrumentation layer ([`instrument::Meter`])
//! - The cost report state machine
//! - Port interfaces (traits) implemented by `quill-infra`
//!
//! ## Architecture Principles
//! - Only depends on `quill-common` and `quill-domain`
//! - No HTTP, filesystem or platform code
//! - All external dependencies via traits

pub mod content;
pub mod cost;
pub mod instrument;
pub mod logging;
pub mod telemetry;

// Re-export specific items to avoid ambiguity
pub use content::ports::ContentStore;
pub use cost::ports::CostSource;
pub use cost::{CostError, CostReport, CostTracker};
pub use instrument::{Counter, DurationHistogram, Gauge, Meter};
pub use logging::ComponentLog;
pub use telemetry::ports::RuntimeStatsSource;
pub use telemetry::{
    CounterRegistry, ExportOutcome, HistogramEstimator, IngestPipeline, SpanBuffer,
    TelemetryStorage,
};
