//! Span consumer: drains the span buffer into its latest-span slot.

use std::sync::Arc;

use quill_core::TelemetryStorage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::error::{SchedulerError, SchedulerResult};
use super::handle::LoopHandle;

/// Single consumer of the span queue.
///
/// Queued spans are not flushed on stop; the receiver goes back to the
/// buffer so a restarted consumer picks up where this one left off.
#[derive(Debug)]
pub struct SpanConsumer {
    storage: Arc<TelemetryStorage>,
    handle: LoopHandle,
}

impl SpanConsumer {
    pub fn new(storage: Arc<TelemetryStorage>, shutdown: CancellationToken) -> Self {
        Self { storage, handle: LoopHandle::new("span_consumer", shutdown) }
    }

    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the consumer is running
    /// and `SchedulerError::StartFailed` if another consumer holds the
    /// receiver.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.handle.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let mut rx = self.storage.spans().take_receiver().ok_or_else(|| {
            SchedulerError::StartFailed("span receiver is held by another consumer".into())
        })?;

        let storage = Arc::clone(&self.storage);
        self.handle
            .start(move |cancel| async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("span consumer cancelled");
                            break;
                        }
                        received = rx.recv() => match received {
                            Some(span) => storage.spans().store_latest(span),
                            None => break,
                        },
                    }
                }
                storage.spans().return_receiver(rx);
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

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quill_core::ComponentLog;
    use quill_domain::{SpanRecord, TelemetryConfig};

    use super::*;

    fn span(name: &str) -> SpanRecord {
        SpanRecord { name: name.into(), ..SpanRecord::default() }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn keeps_latest_span_and_survives_restart() {
        let storage = Arc::new(TelemetryStorage::new(
            &TelemetryConfig::default(),
            ComponentLog::new("telemetry"),
        ));
        let mut consumer = SpanConsumer::new(Arc::clone(&storage), CancellationToken::new());

        consumer.start().await.unwrap();
        storage.spans().write(span("GET /article/a"));
        storage.spans().write(span("GET /article/b"));
        settle().await;
        assert_eq!(storage.spans().latest().name, "GET /article/b");

        consumer.stop().await.unwrap();
        storage.spans().write(span("GET /robots.txt"));
        assert_eq!(storage.spans().latest().name, "GET /article/b", "stopped consumer is idle");

        consumer.start().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while storage.spans().latest().name != "GET /robots.txt" {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("restarted consumer drains the queue");
        consumer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn second_consumer_cannot_start() {
        let storage = Arc::new(TelemetryStorage::new(
            &TelemetryConfig::default(),
            ComponentLog::new("telemetry"),
        ));
        let mut first = SpanConsumer::new(Arc::clone(&storage), CancellationToken::new());
        let mut second = SpanConsumer::new(Arc::clone(&storage), CancellationToken::new());

        first.start().await.unwrap();
        assert!(matches!(second.start().await, Err(SchedulerError::StartFailed(_))));
        first.stop().await.unwrap();
    }
}
