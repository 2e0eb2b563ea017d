//! Application context - dependency injection container

mod background;

use std::sync::Arc;
use std::time::{Duration, Instant};

use quill_core::{
    ComponentLog, ContentStore, Counter, DurationHistogram, IngestPipeline, Meter, TelemetryStorage,
};
use quill_domain::constants::{
    ATTR_ARTICLE, ATTR_BLOCKED, METRIC_ARTICLES_SERVED, METRIC_REQUEST_BLOCKED,
    METRIC_REQUEST_DURATION, METRIC_ROBOTIC_VISITORS,
};
use quill_domain::Config;

pub use background::BackgroundTasks;

/// Type alias for content store port trait object
pub type DynContentStore = dyn ContentStore + 'static;

/// Instruments recorded by the HTTP layer.
#[derive(Debug, Clone)]
pub struct HttpInstruments {
    pub articles_served: Counter,
    pub requests_blocked: Counter,
    pub robotic_visitors: Counter,
    pub request_duration: DurationHistogram,
}

impl HttpInstruments {
    pub fn new(meter: &Meter, boundaries_ms: &[i64]) -> Self {
        Self {
            articles_served: meter.counter_with_attribute(METRIC_ARTICLES_SERVED, ATTR_ARTICLE),
            requests_blocked: meter.counter_with_attribute(METRIC_REQUEST_BLOCKED, ATTR_BLOCKED),
            robotic_visitors: meter.counter(METRIC_ROBOTIC_VISITORS),
            request_duration: meter.duration_histogram(METRIC_REQUEST_DURATION, boundaries_ms),
        }
    }

    /// Count a served article in the total and in its own series.
    pub fn record_article(&self, name: &str) {
        self.articles_served.add(1);
        self.articles_served.add_attributed(name, 1);
    }

    /// Count a blocked request in the total and under `reason`.
    pub fn record_blocked(&self, reason: &str) {
        self.requests_blocked.add(1);
        self.requests_blocked.add_attributed(reason, 1);
    }
}

/// Application context - holds all services and dependencies
///
/// Build it inside the logging root span so component logs carry the
/// deployment tag.
pub struct AppContext {
    pub config: Config,
    pub meter: Meter,
    pub storage: Arc<TelemetryStorage>,
    pub content: Arc<DynContentStore>,
    pub http: HttpInstruments,
    started: Instant,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("env", &self.config.env)
            .field("uptime", &self.uptime())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(config: Config, content: Arc<DynContentStore>) -> Self {
        let storage =
            Arc::new(TelemetryStorage::new(&config.telemetry, ComponentLog::new("telemetry")));
        let meter = Meter::new();
        let http = HttpInstruments::new(&meter, &config.telemetry.histogram_boundaries_ms);

        Self { config, meter, storage, content, http, started: Instant::now() }
    }

    /// Time since the context was built.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Pipeline feeding meter exports into the shared storage.
    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(Arc::clone(&self.storage), ComponentLog::new("ingest"))
    }
}
