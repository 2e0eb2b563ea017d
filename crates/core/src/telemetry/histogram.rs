//! Fixed-boundary request duration histogram with percentile estimation.
//!
//! Each bucket holds its own count (not a cumulative one). An export replaces
//! every bucket and the total; nothing accumulates across exports. The four
//! tracked percentiles are recomputed right after each replace and cached in
//! atomics so readers never walk the buckets.
//!
//! Interpolation assumes values are spread evenly between the previous
//! boundary and the containing one. When lower buckets are empty the estimate
//! can land in a range that held no observations.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use quill_domain::constants::DEFAULT_HISTOGRAM_BOUNDARIES_MS;
use quill_domain::PercentileSnapshot;

/// Bucketed histogram over millisecond boundaries.
#[derive(Debug)]
pub struct HistogramEstimator {
    boundaries: Box<[i64]>,
    buckets: Box<[AtomicI64]>,
    total: AtomicI64,
    /// p50, p90, p95, p99
    cached: [AtomicI64; 4],
    /// Serializes replace + recompute so the cache matches one export.
    update_lock: Mutex<()>,
}

impl Default for HistogramEstimator {
    fn default() -> Self {
        Self::with_default_boundaries()
    }
}

impl HistogramEstimator {
    /// Create an estimator over ascending millisecond `boundaries`.
    pub fn new(boundaries: &[i64]) -> Self {
        Self {
            boundaries: boundaries.into(),
            buckets: boundaries.iter().map(|_| AtomicI64::new(0)).collect(),
            total: AtomicI64::new(0),
            cached: Default::default(),
            update_lock: Mutex::new(()),
        }
    }

    pub fn with_default_boundaries() -> Self {
        Self::new(&DEFAULT_HISTOGRAM_BOUNDARIES_MS)
    }

    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    /// Bucket index of the boundary equal to `ms`.
    pub fn index_of(&self, ms: i64) -> Option<usize> {
        self.boundaries.binary_search(&ms).ok()
    }

    /// Overwrite the total and every bucket count.
    ///
    /// Buckets past the end of `counts` are zeroed, extra entries are
    /// ignored and negative values are clamped to zero. Does not touch the
    /// cached percentiles; see [`Self::record_export`].
    pub fn replace(&self, total: i64, counts: &[i64]) {
        let _guard = self.update_lock.lock();
        self.store(total, counts);
    }

    /// Replace the histogram and refresh the cached percentiles in one step.
    pub fn record_export(&self, total: i64, counts: &[i64]) -> PercentileSnapshot {
        let _guard = self.update_lock.lock();
        self.store(total, counts);
        let snapshot = self.percentiles();
        for (slot, value) in self.cached.iter().zip(snapshot.as_array()) {
            slot.store(value, Ordering::Release);
        }
        snapshot
    }

    fn store(&self, total: i64, counts: &[i64]) {
        for (i, bucket) in self.buckets.iter().enumerate() {
            let count = counts.get(i).copied().unwrap_or(0).max(0);
            bucket.store(count, Ordering::Release);
        }
        self.total.store(total.max(0), Ordering::Release);
    }

    /// Total observation count from the last export.
    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Acquire)
    }

    /// Per-bucket counts from the last export, in boundary order.
    pub fn bucket_counts(&self) -> Vec<i64> {
        self.buckets.iter().map(|b| b.load(Ordering::Acquire)).collect()
    }

    /// Estimate percentile `p` (0 to 100) from the current buckets.
    pub fn percentile(&self, p: f64) -> i64 {
        estimate(&self.boundaries, &self.bucket_counts(), self.total(), p)
    }

    /// Estimate p50, p90, p95 and p99 from one read of the buckets.
    pub fn percentiles(&self) -> PercentileSnapshot {
        let counts = self.bucket_counts();
        let total = self.total();
        let at = |p: f64| estimate(&self.boundaries, &counts, total, p);
        PercentileSnapshot { p50: at(50.0), p90: at(90.0), p95: at(95.0), p99: at(99.0) }
    }

    /// Percentiles computed after the most recent export.
    pub fn cached_percentiles(&self) -> PercentileSnapshot {
        let [p50, p90, p95, p99] = &self.cached;
        PercentileSnapshot {
            p50: p50.load(Ordering::Acquire),
            p90: p90.load(Ordering::Acquire),
            p95: p95.load(Ordering::Acquire),
            p99: p99.load(Ordering::Acquire),
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn estimate(boundaries: &[i64], counts: &[i64], total: i64, p: f64) -> i64 {
    if total <= 0 {
        return 0;
    }

    let target = total as f64 * p / 100.0;
    let mut running: i64 = 0;
    let mut prev_boundary: i64 = 0;

    for (&boundary, &count) in boundaries.iter().zip(counts) {
        running = running.saturating_add(count);
        if running as f64 >= target {
            if count == 0 {
                return boundary;
            }
            let below = (running - count) as f64;
            let fraction = (target - below) / count as f64;
            let width = (boundary - prev_boundary) as f64;
            return (prev_boundary as f64 + fraction * width).round() as i64;
        }
        prev_boundary = boundary;
    }

    // Bucket counts do not add up to the total.
    boundaries.last().copied().unwrap_or(0)
}
