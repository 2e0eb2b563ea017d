//! Cost refresher loop.
//!
//! Disabled tracking renders the static fragment once and the loop exits
//! without touching the network. Enabled tracking fetches immediately and
//! then once per refresh interval. A refresh in flight is abandoned on
//! cancellation and the state published before it is restored.

use std::sync::Arc;
use std::time::Duration;

use quill_common::time::{Interval, IntervalConfig};
use quill_core::CostTracker;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::error::SchedulerResult;
use super::handle::LoopHandle;

#[derive(Debug)]
pub struct CostRefresher {
    tracker: Arc<CostTracker>,
    interval: Duration,
    handle: LoopHandle,
}

impl CostRefresher {
    pub fn new(tracker: Arc<CostTracker>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self { tracker, interval, handle: LoopHandle::new("cost_refresher", shutdown) }
    }

    pub fn tracker(&self) -> &Arc<CostTracker> {
        &self.tracker
    }

    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the refresher is running.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        let tracker = Arc::clone(&self.tracker);
        let interval = self.interval;
        self.handle.start(move |cancel| refresh_loop(tracker, interval, cancel)).await
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

async fn refresh_loop(tracker: Arc<CostTracker>, interval: Duration, cancel: CancellationToken) {
    if !tracker.is_enabled() {
        tracker.refresh().await;
        return;
    }

    let mut ticker = Interval::new(IntervalConfig::new(interval).skip_missed_ticks(true));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cost refresher cancelled");
                break;
            }
            _ = ticker.tick() => {
                let previous = tracker.state();
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracker.abandon_refresh(previous);
                        debug!("cost refresher cancelled during fetch");
                        break;
                    }
                    state = tracker.refresh() => {
                        info!(%state, "cost refresh finished");
                    }
                }
            }
        }
    }
}
