//! HTML metric fragment.
//!
//! The fragment is a flat run of `<p>label: value</p>` lines in a fixed
//! order with shards sorted by key, so identical state and uptime always
//! render identical bytes. Wall-clock stamps are left to the caller.

use std::fmt::{Display, Write};
use std::time::Duration;

use quill_common::time::format_duration;
use quill_domain::constants::{
    METRIC_ARTICLES_SERVED, METRIC_COST_UPDATE_FAILURE, METRIC_COST_UPDATE_SUCCESS,
    METRIC_MEMORY_RESIDENT, METRIC_MEMORY_VIRTUAL, METRIC_REQUEST_BLOCKED, METRIC_ROBOTIC_VISITORS,
    METRIC_RUNTIME_TASKS,
};

use super::histogram::HistogramEstimator;
use super::registry::CounterRegistry;

/// Room for the fixed lines.
const BASE_CAPACITY: usize = 640;
/// Room for one shard line, excluding its key.
const SHARD_LINE_CAPACITY: usize = 48;

/// Render every aggregate as an HTML fragment.
pub fn render_metrics(
    registry: &CounterRegistry,
    histogram: &HistogramEstimator,
    uptime: Duration,
) -> String {
    let shard_lines =
        registry.shard_count(METRIC_ARTICLES_SERVED) + registry.shard_count(METRIC_REQUEST_BLOCKED);
    let mut out = String::with_capacity(BASE_CAPACITY + shard_lines * SHARD_LINE_CAPACITY);

    line(&mut out, "blog.uptime", format_duration(uptime));

    sharded(&mut out, registry, METRIC_ARTICLES_SERVED, "blog.articles.served");
    sharded(&mut out, registry, METRIC_REQUEST_BLOCKED, "blog.requests.blocked");
    line(&mut out, "blog.requests.robots", registry.value_or_zero(METRIC_ROBOTIC_VISITORS));

    let percentiles = histogram.cached_percentiles();
    line(&mut out, "blog.server.request.ms.p50", percentiles.p50);
    line(&mut out, "blog.server.request.ms.p90", percentiles.p90);
    line(&mut out, "blog.server.request.ms.p95", percentiles.p95);
    line(&mut out, "blog.server.request.ms.p99", percentiles.p99);

    line(&mut out, "blog.runtime.tasks.count", registry.value_or_zero(METRIC_RUNTIME_TASKS));
    line(&mut out, "blog.memory.resident.bytes", registry.value_or_zero(METRIC_MEMORY_RESIDENT));
    line(&mut out, "blog.memory.virtual.bytes", registry.value_or_zero(METRIC_MEMORY_VIRTUAL));

    line(&mut out, "blog.cost.update.success", registry.value_or_zero(METRIC_COST_UPDATE_SUCCESS));
    line(&mut out, "blog.cost.update.failure", registry.value_or_zero(METRIC_COST_UPDATE_FAILURE));

    out
}

fn sharded(out: &mut String, registry: &CounterRegistry, metric: &str, label: &str) {
    line(out, label, registry.value_or_zero(metric));
    if let Some(shards) = registry.shards(metric) {
        shards.for_each(|key, value| {
            let _ = write!(out, "<p>{label}.");
            escape_into(out, key);
            let _ = write!(out, ": {value}</p>");
        });
    }
}

fn line(out: &mut String, label: &str, value: impl Display) {
    // Writing into a String cannot fail.
    let _ = write!(out, "<p>{label}: {value}</p>");
}

/// Append `text` with HTML special characters escaped.
pub fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// `text` with HTML special characters escaped.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> (CounterRegistry, HistogramEstimator) {
        let registry = CounterRegistry::new();
        registry.update(METRIC_ARTICLES_SERVED, 7);
        for (article, value) in [("hello-world", 5), ("<b>", 2)] {
            registry.ensure_shard(METRIC_ARTICLES_SERVED, article);
            registry.update_shard(METRIC_ARTICLES_SERVED, article, value);
        }
        registry.update(METRIC_REQUEST_BLOCKED, 3);
        registry.ensure_shard(METRIC_REQUEST_BLOCKED, "URI_LENGTH");
        registry.update_shard(METRIC_REQUEST_BLOCKED, "URI_LENGTH", 3);
        registry.update(METRIC_ROBOTIC_VISITORS, 1);
        registry.update(METRIC_RUNTIME_TASKS, 12);
        registry.update(METRIC_MEMORY_RESIDENT, 1_048_576);
        registry.update(METRIC_MEMORY_VIRTUAL, 4_194_304);
        registry.update(METRIC_COST_UPDATE_SUCCESS, 2);

        let histogram = HistogramEstimator::default();
        histogram.record_export(14, &[1; 14]);
        (registry, histogram)
    }

    #[test]
    fn renders_every_line_in_order() {
        let (registry, histogram) = populated();
        let html = render_metrics(&registry, &histogram, Duration::from_secs(3_661));
        let lines = html.split_inclusive("</p>").collect::<Vec<_>>().join("\n");

        insta::assert_snapshot!(lines, @r"
        <p>blog.uptime: 1h 1m 1s</p>
        <p>blog.articles.served: 7</p>
        <p>blog.articles.served.&lt;b&gt;: 2</p>
        <p>blog.articles.served.hello-world: 5</p>
        <p>blog.requests.blocked: 3</p>
        <p>blog.requests.blocked.URI_LENGTH: 3</p>
        <p>blog.requests.robots: 1</p>
        <p>blog.server.request.ms.p50: 250</p>
        <p>blog.server.request.ms.p90: 6500</p>
        <p>blog.server.request.ms.p95: 8250</p>
        <p>blog.server.request.ms.p99: 9650</p>
        <p>blog.runtime.tasks.count: 12</p>
        <p>blog.memory.resident.bytes: 1048576</p>
        <p>blog.memory.virtual.bytes: 4194304</p>
        <p>blog.cost.update.success: 2</p>
        <p>blog.cost.update.failure: 0</p>
        ");
    }

    #[test]
    fn unchanged_state_renders_identical_bytes() {
        let (registry, histogram) = populated();
        let uptime = Duration::from_secs(42);
        assert_eq!(
            render_metrics(&registry, &histogram, uptime),
            render_metrics(&registry, &histogram, uptime)
        );
    }

    #[test]
    fn empty_store_renders_zeroes() {
        let html =
            render_metrics(&CounterRegistry::new(), &HistogramEstimator::default(), Duration::ZERO);
        assert!(html.starts_with("<p>blog.uptime: 0us</p><p>blog.articles.served: 0</p>"));
        assert!(html.contains("<p>blog.server.request.ms.p99: 0</p>"));
        assert!(!html.contains("blog.articles.served."));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
