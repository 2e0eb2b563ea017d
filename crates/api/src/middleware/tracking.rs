//! Request timing and per-request spans.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use quill_domain::{SpanEvent, SpanKind, SpanRecord, SpanStatus};
use tracing::trace;
use uuid::Uuid;

use crate::context::AppContext;

/// Record the request duration and hand one server span to the span
/// buffer. Never blocks on a full buffer.
pub async fn track_request(
    State(ctx): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start_time = Utc::now();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    ctx.http.request_duration.record(elapsed);

    let status = response.status();
    let span = request_span(&method, &path, status, start_time, Utc::now());
    if !ctx.storage.spans().write(span) {
        trace!(path = %path, "request span dropped");
    }
    response
}

/// Server span for one finished request.
pub fn request_span(
    method: &Method,
    path: &str,
    status: StatusCode,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> SpanRecord {
    let mut attributes = BTreeMap::new();
    attributes.insert("http.request.method".to_owned(), method.as_str().to_owned());
    attributes.insert("url.path".to_owned(), path.to_owned());
    attributes.insert("http.response.status_code".to_owned(), status.as_u16().to_string());

    let (status, status_message) = if status.is_server_error() {
        (SpanStatus::Error, status.canonical_reason().map(str::to_owned))
    } else {
        (SpanStatus::Ok, None)
    };

    SpanRecord {
        name: format!("Serve {path}"),
        trace_id: Uuid::new_v4().simple().to_string(),
        span_id: span_id(),
        parent_span_id: None,
        kind: SpanKind::Server,
        start_time: Some(start_time),
        end_time: Some(end_time),
        attributes,
        events: vec![
            SpanEvent { name: "read".to_owned(), time: start_time },
            SpanEvent { name: "write".to_owned(), time: end_time },
        ],
        status,
        status_message,
    }
}

/// 16 hex digits, the width of a span id.
fn span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}
