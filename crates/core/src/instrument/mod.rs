//! In-process instrumentation layer.
//!
//! Handlers and background loops record into instruments obtained from a
//! shared [`Meter`]. The periodic metric reader calls [`Meter::collect`] and
//! feeds the resulting [`MetricBatch`] to the ingestion pipeline, so every
//! aggregate reaches the telemetry store through the same export path.
//!
//! Instruments are cheap handles (`Arc` inside) and can be cloned freely.
//! Asking the meter twice for the same name returns the same instrument.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use quill_common::collections::ShardMap;
use quill_domain::{HistogramPoint, Metric, MetricBatch, SumPoint};
use tracing::warn;

/// Cumulative counter with an optional single splitting attribute.
///
/// The unattributed total and each attributed series are independent:
/// [`Counter::add`] only moves the total, [`Counter::add_attributed`] only
/// moves one attributed series.
#[derive(Debug, Clone)]
pub struct Counter {
    inner: Arc<CounterState>,
}

#[derive(Debug)]
struct CounterState {
    total: AtomicI64,
    attribute: Option<String>,
    series: ShardMap,
}

impl Counter {
    fn new(attribute: Option<String>) -> Self {
        Self {
            inner: Arc::new(CounterState {
                total: AtomicI64::new(0),
                attribute,
                series: ShardMap::new(),
            }),
        }
    }

    pub fn add(&self, delta: i64) {
        self.inner.total.fetch_add(delta, Ordering::Relaxed);
    }

    /// Add to the series for `value` of the counter's attribute.
    ///
    /// Ignored with a warning when the counter has no attribute.
    pub fn add_attributed(&self, value: &str, delta: i64) {
        if self.inner.attribute.is_none() {
            warn!(attribute_value = value, "attributed add on a counter without attribute");
            return;
        }
        self.inner.series.get_or_create(value).add(delta);
    }

    /// Current unattributed total.
    pub fn value(&self) -> i64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Current value of one attributed series.
    pub fn attributed_value(&self, value: &str) -> Option<i64> {
        self.inner.series.get(value)
    }

    fn points(&self) -> Vec<SumPoint> {
        let mut points = vec![SumPoint::total(self.value())];
        if let Some(key) = &self.inner.attribute {
            self.inner.series.for_each(|value, count| {
                points.push(SumPoint::attributed(count, key.as_str(), value));
            });
        }
        points
    }
}

/// Last-value gauge. Not exported until the first recording.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    inner: Arc<GaugeState>,
}

#[derive(Debug, Default)]
struct GaugeState {
    value: AtomicI64,
    recorded: AtomicBool,
}

impl Gauge {
    pub fn record(&self, value: i64) {
        self.inner.value.store(value, Ordering::Relaxed);
        self.inner.recorded.store(true, Ordering::Release);
    }

    pub fn value(&self) -> Option<i64> {
        self.inner
            .recorded
            .load(Ordering::Acquire)
            .then(|| self.inner.value.load(Ordering::Relaxed))
    }
}

/// Duration histogram with bounds in seconds plus an overflow bucket.
///
/// A value lands in the first bucket whose bound is greater than or equal
/// to it. Not exported until something has been recorded.
#[derive(Debug, Clone)]
pub struct DurationHistogram {
    inner: Arc<HistogramState>,
}

#[derive(Debug)]
struct HistogramState {
    bounds: Box<[f64]>,
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
}

impl DurationHistogram {
    #[allow(clippy::cast_precision_loss)]
    fn new(boundaries_ms: &[i64]) -> Self {
        let bounds: Box<[f64]> = boundaries_ms.iter().map(|ms| *ms as f64 / 1000.0).collect();
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self { inner: Arc::new(HistogramState { bounds, buckets, count: AtomicU64::new(0) }) }
    }

    pub fn record(&self, elapsed: Duration) {
        self.record_secs(elapsed.as_secs_f64());
    }

    pub fn record_secs(&self, secs: f64) {
        let state = &self.inner;
        let index = state.bounds.partition_point(|bound| *bound < secs);
        state.buckets[index].fetch_add(1, Ordering::Relaxed);
        state.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    fn point(&self) -> Option<HistogramPoint> {
        let state = &self.inner;
        let count = state.count.load(Ordering::Relaxed);
        (count > 0).then(|| HistogramPoint {
            bounds: state.bounds.to_vec(),
            bucket_counts: state.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
            count,
        })
    }
}

#[derive(Debug, Clone)]
enum Instrument {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(DurationHistogram),
}

/// Registry of named instruments.
#[derive(Debug, Clone, Default)]
pub struct Meter {
    instruments: Arc<RwLock<BTreeMap<String, Instrument>>>,
}

impl Meter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter without an attribute.
    pub fn counter(&self, name: &str) -> Counter {
        self.counter_inner(name, None)
    }

    /// Counter split by the attribute `key`.
    pub fn counter_with_attribute(&self, name: &str, key: &str) -> Counter {
        self.counter_inner(name, Some(key))
    }

    fn counter_inner(&self, name: &str, key: Option<&str>) -> Counter {
        let make = || Counter::new(key.map(str::to_owned));
        match self.get_or_insert(name, || Instrument::Counter(make())) {
            Instrument::Counter(counter) => counter,
            _ => detached(name, make()),
        }
    }

    pub fn gauge(&self, name: &str) -> Gauge {
        match self.get_or_insert(name, || Instrument::Gauge(Gauge::default())) {
            Instrument::Gauge(gauge) => gauge,
            _ => detached(name, Gauge::default()),
        }
    }

    /// Histogram over millisecond `boundaries_ms`, exported in seconds.
    pub fn duration_histogram(&self, name: &str, boundaries_ms: &[i64]) -> DurationHistogram {
        let make = || DurationHistogram::new(boundaries_ms);
        match self.get_or_insert(name, || Instrument::Histogram(make())) {
            Instrument::Histogram(histogram) => histogram,
            _ => detached(name, make()),
        }
    }

    fn get_or_insert(&self, name: &str, make: impl FnOnce() -> Instrument) -> Instrument {
        if let Some(instrument) = self.instruments.read().get(name) {
            return instrument.clone();
        }
        self.instruments.write().entry(name.to_owned()).or_insert_with(make).clone()
    }

    /// Current value of every instrument, in name order.
    pub fn collect(&self) -> MetricBatch {
        let instruments = self.instruments.read();
        let mut metrics = Vec::with_capacity(instruments.len());

        for (name, instrument) in instruments.iter() {
            match instrument {
                Instrument::Counter(counter) => {
                    metrics.push(Metric::sum(name.as_str(), counter.points()));
                }
                Instrument::Gauge(gauge) => {
                    if let Some(value) = gauge.value() {
                        metrics.push(Metric::gauge(name.as_str(), value));
                    }
                }
                Instrument::Histogram(histogram) => {
                    if let Some(point) = histogram.point() {
                        metrics.push(Metric::histogram(name.as_str(), vec![point]));
                    }
                }
            }
        }

        MetricBatch::new(metrics)
    }
}

/// Instrument registered under `name` is of another kind; hand back one
/// that records but is never exported.
fn detached<T>(name: &str, instrument: T) -> T {
    warn!(instrument = name, "instrument name already registered with another kind");
    instrument
}
