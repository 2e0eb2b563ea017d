//! HTTP routes.
//!
//! Content routes (`/content/`, `/article/*`, `/robots.txt`) pass through
//! the request guard and are timed and traced. Telemetry routes are read
//! directly so polling them does not skew the request metrics.

mod content;
mod telemetry;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};

use crate::context::AppContext;
use crate::middleware::{guard_request, track_request};

pub use content::article_name;

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let content = Router::new()
        .route("/content/", get(content::article_list))
        .route("/article/{*path}", get(content::article))
        .route("/robots.txt", get(content::robots))
        .layer(middleware::from_fn_with_state(Arc::clone(&ctx), guard_request))
        .layer(middleware::from_fn_with_state(Arc::clone(&ctx), track_request));

    let telemetry = Router::new()
        .route("/telemetry/metric", get(telemetry::metric_fragment))
        .route("/telemetry/cost", get(telemetry::cost_fragment))
        .route("/telemetry/trace", get(telemetry::last_trace));

    content.merge(telemetry).with_state(ctx)
}
