//! Port interfaces for telemetry collaborators

use quill_domain::RuntimeStats;

/// Source of process-level runtime statistics.
///
/// Sampling is synchronous and infallible; implementations report zero for
/// anything they cannot read.
pub trait RuntimeStatsSource: Send + Sync {
    /// Take one sample.
    fn sample(&self) -> RuntimeStats;
}
