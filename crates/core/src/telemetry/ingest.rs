//! Metric ingestion: the only writer of counters, gauges and the histogram.
//!
//! Every export cycle hands a [`MetricBatch`] to [`IngestPipeline::export`],
//! which routes each metric by name:
//!
//! - catalog names with gauge or sum data are stored as last values, with
//!   attributed sum points going to the matching shard
//! - the request duration histogram replaces the estimator's buckets from
//!   the batch's last data point and refreshes the cached percentiles
//! - everything else is skipped
//!
//! Export never fails. Misses are logged at debug level, malformed
//! histogram bounds at warn level.

use std::sync::Arc;

use quill_domain::constants::METRIC_REQUEST_DURATION;
use quill_domain::{HistogramPoint, Metric, MetricBatch, MetricData, SumPoint};
use tracing::{debug, trace, warn};

use super::storage::TelemetryStorage;
use crate::logging::ComponentLog;

/// Tolerance, in milliseconds, for float noise when converting second
/// bounds back to whole milliseconds.
const BOUND_TOLERANCE_MS: f64 = 1e-6;

/// Counts of metrics applied and skipped by one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    pub applied: usize,
    pub ignored: usize,
}

/// Routes metric batches into the telemetry store.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    storage: Arc<TelemetryStorage>,
    log: ComponentLog,
}

impl IngestPipeline {
    pub fn new(storage: Arc<TelemetryStorage>, log: ComponentLog) -> Self {
        Self { storage, log }
    }

    pub fn storage(&self) -> &Arc<TelemetryStorage> {
        &self.storage
    }

    /// Apply one export cycle.
    pub fn export(&self, batch: &MetricBatch) -> ExportOutcome {
        let _entered = self.log.span().enter();
        let mut outcome = ExportOutcome::default();

        for metric in &batch.metrics {
            if self.apply(metric) {
                outcome.applied += 1;
            } else {
                outcome.ignored += 1;
            }
        }

        trace!(applied = outcome.applied, ignored = outcome.ignored, "metric export applied");
        outcome
    }

    fn apply(&self, metric: &Metric) -> bool {
        let registry = self.storage.registry();
        let name = metric.name.as_str();

        match &metric.data {
            MetricData::Gauge(points) if registry.contains(name) => points
                .iter()
                .fold(false, |applied, point| registry.update(name, point.value) || applied),
            MetricData::Sum(points) if registry.contains(name) => {
                points.iter().fold(false, |applied, point| self.apply_sum(name, point) || applied)
            }
            MetricData::Histogram(points) if name == METRIC_REQUEST_DURATION => {
                match points.last() {
                    Some(point) => {
                        self.apply_histogram(point);
                        true
                    }
                    None => false,
                }
            }
            _ => {
                debug!(metric = name, "metric not tracked, skipping");
                false
            }
        }
    }

    fn apply_sum(&self, name: &str, point: &SumPoint) -> bool {
        let registry = self.storage.registry();
        let Some(attribute) = &point.attribute else {
            return registry.update(name, point.value);
        };

        if registry.attribute_key(name) != Some(attribute.key.as_str()) {
            debug!(metric = name, attribute = %attribute.key, "attribute not tracked for metric");
            return false;
        }

        match registry.ensure_shard(name, &attribute.value) {
            Some(shard) => {
                shard.store(point.value);
                true
            }
            None => false,
        }
    }

    fn apply_histogram(&self, point: &HistogramPoint) {
        let histogram = self.storage.histogram();
        let mut counts = vec![0_i64; histogram.boundaries().len()];

        for (i, &bound) in point.bounds.iter().enumerate() {
            let Some(&count) = point.bucket_counts.get(i) else {
                warn!(bound, index = i, "histogram bound has no bucket count, skipping");
                continue;
            };
            match bound_to_ms(bound).and_then(|ms| histogram.index_of(ms)) {
                Some(index) => counts[index] = saturating_i64(count),
                None => warn!(bound, "histogram bound does not match a known boundary"),
            }
        }

        let percentiles = histogram.record_export(saturating_i64(point.count), &counts);
        trace!(
            total = point.count,
            p50 = percentiles.p50,
            p99 = percentiles.p99,
            "request duration percentiles refreshed"
        );
    }
}

/// Convert a bound in seconds to whole milliseconds by truncation.
///
/// Values within [`BOUND_TOLERANCE_MS`] of an integer snap to it first, so
/// `1.001` maps to 1001 even though `1.001 * 1000.0` is slightly below.
#[allow(clippy::cast_possible_truncation)]
fn bound_to_ms(bound_secs: f64) -> Option<i64> {
    if !bound_secs.is_finite() {
        return None;
    }
    let ms = bound_secs * 1000.0;
    let rounded = ms.round();
    let whole = if (ms - rounded).abs() < BOUND_TOLERANCE_MS { rounded } else { ms.trunc() };
    Some(whole as i64)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
