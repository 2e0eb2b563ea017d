//! Metric batch model pushed by the instrumentation layer on every export
//! cycle.
//!
//! Sums are cumulative: each point carries the running total observed since
//! process start, not a delta. Histogram points carry per-bucket counts with
//! bounds expressed in seconds; `bucket_counts` has one more entry than
//! `bounds` for the overflow bucket.

use serde::{Deserialize, Serialize};

/// One export cycle worth of metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBatch {
    pub metrics: Vec<Metric>,
}

impl MetricBatch {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }
}

/// A named metric and its data points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub data: MetricData,
}

impl Metric {
    pub fn gauge(name: impl Into<String>, value: i64) -> Self {
        Self { name: name.into(), data: MetricData::Gauge(vec![GaugePoint { value }]) }
    }

    pub fn sum(name: impl Into<String>, points: Vec<SumPoint>) -> Self {
        Self { name: name.into(), data: MetricData::Sum(points) }
    }

    pub fn histogram(name: impl Into<String>, points: Vec<HistogramPoint>) -> Self {
        Self { name: name.into(), data: MetricData::Histogram(points) }
    }
}

/// Data carried by a [`Metric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum MetricData {
    Gauge(Vec<GaugePoint>),
    Sum(Vec<SumPoint>),
    Histogram(Vec<HistogramPoint>),
}

/// Instantaneous reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugePoint {
    pub value: i64,
}

/// Cumulative sum, optionally split by a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumPoint {
    pub value: i64,
    pub attribute: Option<Attribute>,
}

impl SumPoint {
    pub fn total(value: i64) -> Self {
        Self { value, attribute: None }
    }

    pub fn attributed(value: i64, key: impl Into<String>, attr_value: impl Into<String>) -> Self {
        Self { value, attribute: Some(Attribute::new(key, attr_value)) }
    }
}

/// Single key/value attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Histogram snapshot with bounds in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramPoint {
    pub bounds: Vec<f64>,
    pub bucket_counts: Vec<u64>,
    pub count: u64,
}
