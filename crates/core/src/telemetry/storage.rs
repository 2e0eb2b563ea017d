//! Process-wide telemetry store and its read surface.

use std::time::Duration;

use parking_lot::RwLock;
use quill_domain::constants::{
    METRIC_ARTICLES_SERVED, METRIC_COST_UPDATE_FAILURE, METRIC_COST_UPDATE_SUCCESS,
    METRIC_MEMORY_RESIDENT, METRIC_MEMORY_VIRTUAL, METRIC_REQUEST_BLOCKED, METRIC_ROBOTIC_VISITORS,
    METRIC_RUNTIME_TASKS,
};
use quill_domain::{CostRefreshState, ShardValue, TelemetryConfig, TelemetrySnapshot};

use super::histogram::HistogramEstimator;
use super::registry::CounterRegistry;
use super::render;
use super::span_buffer::SpanBuffer;
use crate::logging::ComponentLog;

/// Rendered cost report fragment and the refresher state that produced it.
#[derive(Debug)]
pub struct CostCache {
    html: RwLock<String>,
    state: RwLock<CostRefreshState>,
}

impl Default for CostCache {
    fn default() -> Self {
        Self {
            html: RwLock::new(String::new()),
            state: RwLock::new(CostRefreshState::FetchingInitial),
        }
    }
}

impl CostCache {
    pub fn fragment(&self) -> String {
        self.html.read().clone()
    }

    pub fn has_fragment(&self) -> bool {
        !self.html.read().is_empty()
    }

    pub fn replace(&self, html: String) {
        *self.html.write() = html;
    }

    pub fn state(&self) -> CostRefreshState {
        *self.state.read()
    }

    pub fn set_state(&self, state: CostRefreshState) {
        *self.state.write() = state;
    }
}

/// Every telemetry aggregate the process keeps.
///
/// Created once at startup and shared behind an `Arc`.
#[derive(Debug)]
pub struct TelemetryStorage {
    registry: CounterRegistry,
    histogram: HistogramEstimator,
    spans: SpanBuffer,
    cost: CostCache,
}

impl TelemetryStorage {
    pub fn new(config: &TelemetryConfig, log: ComponentLog) -> Self {
        Self {
            registry: CounterRegistry::new(),
            histogram: HistogramEstimator::new(&config.histogram_boundaries_ms),
            spans: SpanBuffer::new(config.span_buffer_capacity, log),
            cost: CostCache::default(),
        }
    }

    pub fn registry(&self) -> &CounterRegistry {
        &self.registry
    }

    pub fn histogram(&self) -> &HistogramEstimator {
        &self.histogram
    }

    pub fn spans(&self) -> &SpanBuffer {
        &self.spans
    }

    pub fn cost(&self) -> &CostCache {
        &self.cost
    }

    /// Serializable view of every aggregate.
    pub fn snapshot(&self, uptime: Duration) -> TelemetrySnapshot {
        let registry = &self.registry;
        TelemetrySnapshot {
            uptime_secs: uptime.as_secs(),
            articles_served: registry.value_or_zero(METRIC_ARTICLES_SERVED),
            articles_by_name: self.shard_values(METRIC_ARTICLES_SERVED),
            requests_blocked: registry.value_or_zero(METRIC_REQUEST_BLOCKED),
            blocked_by_reason: self.shard_values(METRIC_REQUEST_BLOCKED),
            robotic_visitors: registry.value_or_zero(METRIC_ROBOTIC_VISITORS),
            request_duration_ms: self.histogram.cached_percentiles(),
            runtime_tasks: registry.value_or_zero(METRIC_RUNTIME_TASKS),
            memory_resident_bytes: registry.value_or_zero(METRIC_MEMORY_RESIDENT),
            memory_virtual_bytes: registry.value_or_zero(METRIC_MEMORY_VIRTUAL),
            cost_update_success: registry.value_or_zero(METRIC_COST_UPDATE_SUCCESS),
            cost_update_failure: registry.value_or_zero(METRIC_COST_UPDATE_FAILURE),
            cost_state: self.cost.state(),
            cost_fragment: self.cost.fragment(),
        }
    }

    /// HTML metric fragment; identical output for identical state and uptime.
    pub fn render_metrics(&self, uptime: Duration) -> String {
        render::render_metrics(&self.registry, &self.histogram, uptime)
    }

    /// Cached cost report HTML.
    pub fn cost_fragment(&self) -> String {
        self.cost.fragment()
    }

    /// Latest consumed span as JSON.
    ///
    /// # Errors
    /// Returns the serializer error.
    pub fn latest_span_json(&self) -> Result<String, serde_json::Error> {
        self.spans.read_json()
    }

    fn shard_values(&self, name: &str) -> Vec<ShardValue> {
        self.registry
            .shards(name)
            .map(|shards| {
                shards
                    .snapshot()
                    .into_iter()
                    .map(|(key, value)| ShardValue { key, value })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> TelemetryStorage {
        TelemetryStorage::new(&TelemetryConfig::default(), ComponentLog::new("telemetry"))
    }

    #[test]
    fn fresh_snapshot_is_zeroed() {
        let snapshot = storage().snapshot(Duration::from_secs(3));
        assert_eq!(snapshot.uptime_secs, 3);
        assert_eq!(snapshot.articles_served, 0);
        assert!(snapshot.articles_by_name.is_empty());
        assert_eq!(snapshot.request_duration_ms.p99, 0);
        assert_eq!(snapshot.cost_state, CostRefreshState::FetchingInitial);
        assert!(snapshot.cost_fragment.is_empty());
    }

    #[test]
    fn snapshot_lists_shards_sorted() {
        let storage = storage();
        let registry = storage.registry();
        for (article, value) in [("zebra", 2), ("apple", 5)] {
            registry.ensure_shard(METRIC_ARTICLES_SERVED, article);
            registry.update_shard(METRIC_ARTICLES_SERVED, article, value);
        }
        registry.update(METRIC_ARTICLES_SERVED, 7);

        let snapshot = storage.snapshot(Duration::ZERO);
        assert_eq!(snapshot.articles_served, 7);
        assert_eq!(
            snapshot.articles_by_name,
            vec![
                ShardValue { key: "apple".into(), value: 5 },
                ShardValue { key: "zebra".into(), value: 2 },
            ]
        );
        let json = serde_json::to_value(&snapshot).expect("snapshot serializes");
        assert_eq!(json["cost_state"], "fetching_initial");
    }

    #[test]
    fn cost_cache_replaces_fragment() {
        let storage = storage();
        assert!(!storage.cost().has_fragment());
        storage.cost().replace("<tr></tr>".into());
        storage.cost().set_state(CostRefreshState::Cached);
        assert_eq!(storage.cost_fragment(), "<tr></tr>");
        assert_eq!(storage.cost().state(), CostRefreshState::Cached);
    }
}
