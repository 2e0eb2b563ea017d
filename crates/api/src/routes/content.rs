//! Article pages, the article index and robots.txt.

use std::fmt::Write;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use quill_core::telemetry::render::escape_into;
use tracing::debug;

use crate::context::AppContext;

/// Last non-empty segment of an article path, so `/article/a/b/` serves
/// `b`.
pub fn article_name(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rsplit('/').next().filter(|name| !name.is_empty())
}

pub(super) async fn article(
    State(ctx): State<Arc<AppContext>>,
    Path(path): Path<String>,
) -> Response {
    let Some(name) = article_name(&path) else {
        return not_found();
    };
    let Some(html) = ctx.content.article(name) else {
        debug!(article = name, "article not found");
        return not_found();
    };

    ctx.http.record_article(name);
    Html(html.to_string()).into_response()
}

pub(super) async fn article_list(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    let names = ctx.content.article_names();
    let mut html = String::with_capacity(16 + names.len() * 64);
    html.push_str("<ul>");
    for name in &names {
        html.push_str("<li><a href=\"/article/");
        html.push_str(&urlencoding::encode(name));
        html.push_str("\">");
        escape_into(&mut html, name);
        html.push_str("</a></li>");
    }
    html.push_str("</ul>");
    Html(html)
}

pub(super) async fn robots(State(ctx): State<Arc<AppContext>>) -> String {
    ctx.http.robotic_visitors.add(1);

    let mut body = String::from("User-agent: *\nDisallow: /content\nDisallow: /telemetry/\n");
    if let Some(url) = &ctx.config.server.public_url {
        let _ = write!(body, "\nSitemap: {}/sitemap.xml", url.trim_end_matches('/'));
    }
    body
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}
