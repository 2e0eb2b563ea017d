//! Periodic metric reader.
//!
//! Every export interval the reader collects the shared [`Meter`] and hands
//! the batch to [`IngestPipeline::export`]. The first export happens one
//! interval after start. On stop one last export runs so the store reflects
//! everything recorded before shutdown.

use std::time::Duration;

use quill_common::time::{Interval, IntervalConfig};
use quill_core::{IngestPipeline, Meter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::error::SchedulerResult;
use super::handle::LoopHandle;

/// Drives collect → export on a fixed interval.
#[derive(Debug)]
pub struct MetricReader {
    meter: Meter,
    pipeline: IngestPipeline,
    interval: Duration,
    handle: LoopHandle,
}

impl MetricReader {
    pub fn new(
        meter: Meter,
        pipeline: IngestPipeline,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self { meter, pipeline, interval, handle: LoopHandle::new("metric_reader", shutdown) }
    }

    /// Run one collect and export immediately.
    pub fn export_now(&self) {
        export_once(&self.meter, &self.pipeline);
    }

    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the reader is running.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        let meter = self.meter.clone();
        let pipeline = self.pipeline.clone();
        let interval = self.interval;
        self.handle.start(move |cancel| read_loop(meter, pipeline, interval, cancel)).await
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

async fn read_loop(
    meter: Meter,
    pipeline: IngestPipeline,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = Interval::new(IntervalConfig::new(interval).delay_first_tick(true));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                export_once(&meter, &pipeline);
                debug!("metric reader cancelled");
                break;
            }
            _ = ticker.tick() => export_once(&meter, &pipeline),
        }
    }
}

fn export_once(meter: &Meter, pipeline: &IngestPipeline) {
    pipeline.export(&meter.collect());
}
