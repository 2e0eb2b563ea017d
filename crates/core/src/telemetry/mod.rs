//! In-process telemetry aggregation.
//!
//! Writers (the periodic metric reader and the span producers) push into the
//! [`TelemetryStorage`] through [`IngestPipeline::export`] and
//! [`SpanBuffer::write`]. HTTP handlers read it through the query surface
//! ([`TelemetryStorage::render_metrics`], [`TelemetryStorage::snapshot`]),
//! which only performs atomic loads and short read locks.

pub mod histogram;
pub mod ingest;
pub mod ports;
pub mod registry;
pub mod render;
pub mod span_buffer;
pub mod storage;

pub use histogram::HistogramEstimator;
pub use ingest::{ExportOutcome, IngestPipeline};
pub use registry::CounterRegistry;
pub use span_buffer::SpanBuffer;
pub use storage::{CostCache, TelemetryStorage};
