//! # Quill Infrastructure
//!
//! Adapters that connect `quill-core` to the outside world.
//!
//! This crate contains:
//! - Configuration loading (environment and TOML/JSON files)
//! - Logging setup (`tracing-subscriber`, non-blocking file output)
//! - The cost report API source, with retry on server and connect errors
//! - `sysinfo` runtime statistics and the filesystem article store
//! - Background loops (metric reader, runtime sampler, cost refresher,
//!   span consumer)

pub mod config;
pub mod content;
pub mod cost;
pub mod errors;
pub mod logging;
pub mod runtime_stats;
pub mod scheduling;

pub use content::FsContentStore;
pub use cost::HttpCostSource;
pub use errors::InfraError;
pub use logging::{init_logging, LoggingGuard};
pub use runtime_stats::SysinfoRuntimeStats;
pub use scheduling::{
    CostRefresher, LoopHandle, MetricReader, RuntimeSampler, SchedulerError, SchedulerResult,
    SpanConsumer,
};
