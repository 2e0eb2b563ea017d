//! Background loops owned by the server.

use std::sync::Arc;

use quill_core::{ComponentLog, CostSource, CostTracker, RuntimeStatsSource};
use quill_infra::{
    CostRefresher, MetricReader, RuntimeSampler, SchedulerError, SchedulerResult, SpanConsumer,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::AppContext;

/// The four telemetry loops, started and stopped together.
///
/// Every loop runs under a child of the shared shutdown token, so
/// cancelling that token stops all of them.
#[derive(Debug)]
pub struct BackgroundTasks {
    metric_reader: MetricReader,
    runtime_sampler: RuntimeSampler,
    cost_refresher: CostRefresher,
    span_consumer: SpanConsumer,
}

impl BackgroundTasks {
    pub fn new(
        ctx: &AppContext,
        runtime_stats: Arc<dyn RuntimeStatsSource>,
        cost_source: Arc<dyn CostSource>,
        shutdown: &CancellationToken,
    ) -> Self {
        let telemetry = &ctx.config.telemetry;
        let tracker = Arc::new(CostTracker::new(
            Arc::clone(&ctx.storage),
            cost_source,
            &ctx.config.cost,
            &ctx.meter,
            ComponentLog::new("cost"),
        ));

        Self {
            metric_reader: MetricReader::new(
                ctx.meter.clone(),
                ctx.pipeline(),
                telemetry.export_interval(),
                shutdown.clone(),
            ),
            runtime_sampler: RuntimeSampler::new(
                runtime_stats,
                &ctx.meter,
                telemetry.runtime_sample_interval(),
                shutdown.clone(),
            ),
            cost_refresher: CostRefresher::new(
                tracker,
                ctx.config.cost.refresh_interval(),
                shutdown.clone(),
            ),
            span_consumer: SpanConsumer::new(Arc::clone(&ctx.storage), shutdown.clone()),
        }
    }

    pub fn cost_tracker(&self) -> &Arc<CostTracker> {
        self.cost_refresher.tracker()
    }

    /// Start every loop. A start failure stops the loops already running.
    ///
    /// # Errors
    /// Returns the first start failure.
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if let Err(e) = self.start_each().await {
            warn!(error = %e, "background loop failed to start, stopping the rest");
            self.stop().await;
            return Err(e);
        }
        info!("background loops started");
        Ok(())
    }

    async fn start_each(&mut self) -> SchedulerResult<()> {
        self.metric_reader.start().await?;
        self.runtime_sampler.start().await?;
        self.cost_refresher.start().await?;
        self.span_consumer.start().await
    }

    /// Stop every loop, logging failures instead of returning them.
    ///
    /// Loops that already exited (the cost refresher with tracking
    /// disabled, or anything after shutdown was cancelled) are skipped.
    pub async fn stop(&mut self) {
        let results = [
            ("metric_reader", self.metric_reader.stop().await),
            ("runtime_sampler", self.runtime_sampler.stop().await),
            ("cost_refresher", self.cost_refresher.stop().await),
            ("span_consumer", self.span_consumer.stop().await),
        ];
        for (name, result) in results {
            match result {
                Ok(()) | Err(SchedulerError::NotRunning) => {}
                Err(e) => warn!(scheduler = name, error = %e, "failed to stop background loop"),
            }
        }
        info!("background loops stopped");
    }

    pub fn is_running(&self) -> bool {
        self.metric_reader.is_running()
            || self.runtime_sampler.is_running()
            || self.cost_refresher.is_running()
            || self.span_consumer.is_running()
    }
}
