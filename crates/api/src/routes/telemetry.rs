//! Telemetry fragments polled by the blog front end.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use chrono::Utc;
use tracing::error;

use crate::context::AppContext;

const TRACE_ERROR_BODY: &str = r#"{"error": "Failed to get trace data"}"#;

pub(super) async fn metric_fragment(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    let mut html = ctx.storage.render_metrics(ctx.uptime());
    html.push_str("<p>Last Updated: ");
    html.push_str(&Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
    html.push_str("</p>");
    Html(html)
}

pub(super) async fn cost_fragment(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    Html(ctx.storage.cost_fragment())
}

pub(super) async fn last_trace(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.storage.latest_span_json() {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            error!(error = %e, "failed to serialize latest span");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                TRACE_ERROR_BODY,
            )
                .into_response()
        }
    }
}
