//! Bounded hand-off of completed spans to the span consumer.
//!
//! Producers never wait: when the channel is full the span is dropped and
//! counted. The consumer keeps only the most recent span, which is what the
//! trace endpoint serves.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use quill_domain::SpanRecord;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::logging::ComponentLog;

/// Drop-on-full span queue plus the latest-span slot.
#[derive(Debug)]
pub struct SpanBuffer {
    tx: mpsc::Sender<SpanRecord>,
    rx: Mutex<Option<mpsc::Receiver<SpanRecord>>>,
    latest: RwLock<SpanRecord>,
    capacity: usize,
    dropped: AtomicU64,
    log: ComponentLog,
}

impl SpanBuffer {
    /// Create a buffer holding at most `capacity` queued spans (minimum 1).
    pub fn new(capacity: usize, log: ComponentLog) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            latest: RwLock::new(SpanRecord::default()),
            capacity,
            dropped: AtomicU64::new(0),
            log,
        }
    }

    /// Queue `span` without blocking.
    ///
    /// Returns `false` if the span was dropped because the queue is full or
    /// the consumer has gone away.
    pub fn write(&self, span: SpanRecord) -> bool {
        match self.tx.try_send(span) {
            Ok(()) => true,
            Err(TrySendError::Full(span)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.log.in_scope(|| {
                    warn!(
                        span_name = %span.name,
                        dropped,
                        capacity = self.capacity,
                        "span buffer full, dropping span"
                    );
                });
                false
            }
            Err(TrySendError::Closed(span)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.log.in_scope(|| {
                    debug!(span_name = %span.name, "span consumer stopped, dropping span");
                });
                false
            }
        }
    }

    /// Trace exporter entry point: forward only the last span of a batch.
    pub fn export_spans(&self, spans: Vec<SpanRecord>) -> bool {
        match spans.into_iter().last() {
            Some(span) => self.write(span),
            None => false,
        }
    }

    /// Hand the receiving half to the consumer loop.
    ///
    /// Returns `None` while another consumer holds it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<SpanRecord>> {
        self.rx.lock().take()
    }

    /// Give the receiver back when a consumer stops, so a later one can
    /// resume. Spans still queued stay queued.
    pub fn return_receiver(&self, rx: mpsc::Receiver<SpanRecord>) {
        *self.rx.lock() = Some(rx);
    }

    /// Replace the latest span.
    pub fn store_latest(&self, span: SpanRecord) {
        *self.latest.write() = span;
    }

    /// Copy of the latest span.
    pub fn latest(&self) -> SpanRecord {
        self.latest.read().clone()
    }

    /// Latest span as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns the serializer error; never-written buffers serialize the
    /// empty span successfully.
    pub fn read_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.latest.read())
    }

    /// Spans dropped since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
