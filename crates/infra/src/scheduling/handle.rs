//! Start/stop lifecycle shared by every background loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns one spawned loop.
///
/// Each start derives a fresh child of the process-wide shutdown token, so
/// a loop stops either on its own [`LoopHandle::stop`] or when the whole
/// process shuts down, and can be restarted after a stop.
#[derive(Debug)]
pub struct LoopHandle {
    name: &'static str,
    shutdown: CancellationToken,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl LoopHandle {
    pub fn new(name: &'static str, shutdown: CancellationToken) -> Self {
        Self {
            name,
            cancellation_token: shutdown.child_token(),
            shutdown,
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Spawn the future built by `make`, handing it the loop's token.
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the previous task has not
    /// finished.
    pub async fn start<F, Fut>(&mut self, make: F) -> SchedulerResult<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        // fresh token so a stopped loop can be started again
        self.cancellation_token = self.shutdown.child_token();
        let handle = tokio::spawn(make(self.cancellation_token.clone()));
        *self.task_handle.lock().await = Some(handle);

        info!(scheduler = self.name, "scheduler started");
        Ok(())
    }

    /// Cancel the task and wait for it to finish.
    ///
    /// # Errors
    /// Returns `SchedulerError::NotRunning` if nothing is running,
    /// `SchedulerError::Timeout` if the task does not finish in time and
    /// `SchedulerError::TaskJoinFailed` if it panicked.
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { duration: JOIN_TIMEOUT })??;
        }

        info!(scheduler = self.name, "scheduler stopped");
        Ok(())
    }

    /// Whether a spawned task exists and has not finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(scheduler = self.name, "scheduler dropped while running; cancelling task");
            self.cancellation_token.cancel();
        }
    }
}
