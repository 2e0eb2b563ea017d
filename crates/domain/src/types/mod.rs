//! Domain types and models
//!
//! Everything that crosses a crate boundary in the telemetry pipeline lives
//! here: the batch shape pushed by the instrumentation layer, span records,
//! cost report rows, runtime samples and the read-only snapshot.

pub mod cost;
pub mod metrics;
pub mod runtime;
pub mod snapshot;
pub mod span;

pub use cost::{CostRefreshState, CostWindow, ServiceCost};
pub use metrics::{
    Attribute, GaugePoint, HistogramPoint, Metric, MetricBatch, MetricData, SumPoint,
};
pub use runtime::RuntimeStats;
pub use snapshot::{PercentileSnapshot, ShardValue, TelemetrySnapshot};
pub use span::{SpanEvent, SpanKind, SpanRecord, SpanStatus};
