//! Span records captured from request handling.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Role of a span within a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
}

impl_domain_status_conversions!(SpanKind {
    Internal => "internal",
    Server => "server",
    Client => "client",
});

/// Completion status of a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl_domain_status_conversions!(SpanStatus {
    Unset => "unset",
    Ok => "ok",
    Error => "error",
});

/// Timestamped annotation recorded during a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub time: DateTime<Utc>,
}

/// A completed span.
///
/// The default value is the "never written" span; it serializes to a JSON
/// object with empty fields rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub name: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub kind: SpanKind,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<String, String>,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
    pub status_message: Option<String>,
}

impl SpanRecord {
    /// Elapsed milliseconds between start and end, if both are set.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
