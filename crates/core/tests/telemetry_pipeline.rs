//! End-to-end flow from instruments through export into the rendered
//! fragment.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quill_core::{ComponentLog, IngestPipeline, Meter, TelemetryStorage};
use quill_domain::constants::{
    ATTR_ARTICLE, ATTR_BLOCKED, DEFAULT_HISTOGRAM_BOUNDARIES_MS, METRIC_ARTICLES_SERVED,
    METRIC_REQUEST_BLOCKED, METRIC_REQUEST_DURATION, METRIC_ROBOTIC_VISITORS, METRIC_RUNTIME_TASKS,
};
use quill_domain::TelemetryConfig;

fn pipeline() -> IngestPipeline {
    let storage = Arc::new(TelemetryStorage::new(
        &TelemetryConfig::default(),
        ComponentLog::new("telemetry"),
    ));
    IngestPipeline::new(storage, ComponentLog::new("ingest"))
}

#[test]
fn meter_exports_reach_rendered_fragment() {
    let meter = Meter::new();
    let pipeline = pipeline();

    let served = meter.counter_with_attribute(METRIC_ARTICLES_SERVED, ATTR_ARTICLE);
    let blocked = meter.counter_with_attribute(METRIC_REQUEST_BLOCKED, ATTR_BLOCKED);
    let robots = meter.counter(METRIC_ROBOTIC_VISITORS);
    let tasks = meter.gauge(METRIC_RUNTIME_TASKS);
    let latency =
        meter.duration_histogram(METRIC_REQUEST_DURATION, &DEFAULT_HISTOGRAM_BOUNDARIES_MS);

    for _ in 0..3 {
        served.add(1);
        served.add_attributed("intro", 1);
    }
    blocked.add(1);
    blocked.add_attributed("BAD_METHOD", 1);
    robots.add(2);
    tasks.record(17);
    for ms in [3, 4, 8, 20, 40] {
        latency.record(Duration::from_millis(ms));
    }

    let outcome = pipeline.export(&meter.collect());
    assert_eq!(outcome.ignored, 0);
    assert_eq!(outcome.applied, 5);

    let html = pipeline.storage().render_metrics(Duration::from_secs(65));
    assert!(html.contains("<p>blog.uptime: 1m 5s</p>"));
    assert!(html.contains("<p>blog.articles.served: 3</p><p>blog.articles.served.intro: 3</p>"));
    assert!(html.contains("<p>blog.requests.blocked.BAD_METHOD: 1</p>"));
    assert!(html.contains("<p>blog.requests.robots: 2</p>"));
    assert!(html.contains("<p>blog.runtime.tasks.count: 17</p>"));

    // counts {5ms: 2, 10ms: 1, 25ms: 1, 50ms: 1}
    let percentiles = pipeline.storage().histogram().cached_percentiles();
    assert_eq!(percentiles.p50, 8);
    assert_eq!(percentiles.p99, 49);
}

#[test]
fn repeated_exports_overwrite_cumulative_values() {
    let meter = Meter::new();
    let pipeline = pipeline();
    let robots = meter.counter(METRIC_ROBOTIC_VISITORS);

    robots.add(1);
    pipeline.export(&meter.collect());
    robots.add(4);
    pipeline.export(&meter.collect());
    pipeline.export(&meter.collect());

    let snapshot = pipeline.storage().snapshot(Duration::ZERO);
    assert_eq!(snapshot.robotic_visitors, 5);
}

#[test]
fn concurrent_exports_and_reads_do_not_block() {
    let pipeline = pipeline();
    let meter = Meter::new();
    let served = meter.counter_with_attribute(METRIC_ARTICLES_SERVED, ATTR_ARTICLE);

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let served = served.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    served.add_attributed(&format!("article-{w}-{}", i % 10), 1);
                }
            })
        })
        .collect();

    let reader = {
        let storage = Arc::clone(pipeline.storage());
        thread::spawn(move || {
            for _ in 0..200 {
                let html = storage.render_metrics(Duration::ZERO);
                assert!(html.starts_with("<p>blog.uptime:"));
            }
        })
    };

    for _ in 0..50 {
        pipeline.export(&meter.collect());
    }
    for writer in writers {
        writer.join().expect("writer panicked");
    }
    reader.join().expect("reader panicked");
    pipeline.export(&meter.collect());

    let snapshot = pipeline.storage().snapshot(Duration::ZERO);
    assert_eq!(snapshot.articles_by_name.len(), 40);
    assert!(snapshot.articles_by_name.iter().all(|shard| shard.value == 25));
    assert!(snapshot.articles_by_name.windows(2).all(|w| w[0].key < w[1].key));
}
