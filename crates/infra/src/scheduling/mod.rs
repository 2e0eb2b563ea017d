//! Background loops of the telemetry pipeline
//!
//! - Metric reader (collect the meter and export into the store)
//! - Runtime sampler (task count and memory gauges)
//! - Cost refresher (cost report fragment)
//! - Span consumer (latest span for the trace endpoint)
//!
//! Every loop shares the same lifecycle ([`LoopHandle`]):
//! - Explicit start/stop with a join handle for the spawned task
//! - A child of the process-wide shutdown token, cancelled cooperatively
//!   through `tokio::select!`
//! - Bounded wait when joining on stop

pub mod cost_refresher;
pub mod error;
pub mod handle;
pub mod metric_reader;
pub mod runtime_sampler;
pub mod span_consumer;

pub use cost_refresher::CostRefresher;
pub use error::{SchedulerError, SchedulerResult};
pub use handle::LoopHandle;
pub use metric_reader::MetricReader;
pub use runtime_sampler::RuntimeSampler;
pub use span_consumer::SpanConsumer;
