//! Runtime sampler: records process statistics as gauges.

use std::sync::Arc;
use std::time::Duration;

use quill_common::time::Interval;
use quill_core::{Gauge, Meter, RuntimeStatsSource};
use quill_domain::constants::{METRIC_MEMORY_RESIDENT, METRIC_MEMORY_VIRTUAL, METRIC_RUNTIME_TASKS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use super::error::SchedulerResult;
use super::handle::LoopHandle;

#[derive(Debug, Clone)]
struct RuntimeGauges {
    tasks: Gauge,
    resident: Gauge,
    virtual_memory: Gauge,
}

impl RuntimeGauges {
    fn new(meter: &Meter) -> Self {
        Self {
            tasks: meter.gauge(METRIC_RUNTIME_TASKS),
            resident: meter.gauge(METRIC_MEMORY_RESIDENT),
            virtual_memory: meter.gauge(METRIC_MEMORY_VIRTUAL),
        }
    }

    fn sample(&self, source: &dyn RuntimeStatsSource) {
        let stats = source.sample();
        self.tasks.record(saturating_i64(stats.tasks));
        self.resident.record(saturating_i64(stats.resident_bytes));
        self.virtual_memory.record(saturating_i64(stats.virtual_bytes));
        trace!(
            tasks = stats.tasks,
            resident = stats.resident_bytes,
            virtual_bytes = stats.virtual_bytes,
            "runtime sampled"
        );
    }
}

/// Samples a [`RuntimeStatsSource`] on a fixed interval, starting
/// immediately.
pub struct RuntimeSampler {
    source: Arc<dyn RuntimeStatsSource>,
    gauges: RuntimeGauges,
    interval: Duration,
    handle: LoopHandle,
}

impl std::fmt::Debug for RuntimeSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeSampler")
            .field("interval", &self.interval)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl RuntimeSampler {
    pub fn new(
        source: Arc<dyn RuntimeStatsSource>,
        meter: &Meter,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            gauges: RuntimeGauges::new(meter),
            interval,
            handle: LoopHandle::new("runtime_sampler", shutdown),
        }
    }

    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the sampler is running.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        let source = Arc::clone(&self.source);
        let gauges = self.gauges.clone();
        let interval = self.interval;
        self.handle
            .start(move |cancel| async move {
                let mut ticker = Interval::simple(interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("runtime sampler cancelled");
                            break;
                        }
                        _ = ticker.tick() => gauges.sample(source.as_ref()),
                    }
                }
            })
            .await
    }

    /// # Errors
    /// See [`LoopHandle::stop`].
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        self.handle.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
