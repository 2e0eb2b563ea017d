//! Background loops wired through the application context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use quill_core::{ContentStore, CostError, CostSource, RuntimeStatsSource};
use quill_domain::{Config, CostRefreshState, CostWindow, Result, RuntimeStats, ServiceCost};
use quill_infra::SchedulerError;
use quill_server::{router, AppContext, BackgroundTasks};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct OneArticle;

impl ContentStore for OneArticle {
    fn article(&self, name: &str) -> Option<Arc<str>> {
        (name == "intro").then(|| Arc::from("<h1>Intro</h1>"))
    }

    fn article_names(&self) -> Vec<String> {
        vec!["intro".to_owned()]
    }

    fn reload(&self) -> Result<usize> {
        Ok(1)
    }
}

struct FixedStats;

impl RuntimeStatsSource for FixedStats {
    fn sample(&self) -> RuntimeStats {
        RuntimeStats { tasks: 7, resident_bytes: 2048, virtual_bytes: 4096 }
    }
}

#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl CostSource for CountingSource {
    async fn costs_for_window(
        &self,
        _: CostWindow,
    ) -> std::result::Result<Vec<ServiceCost>, CostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn loops_feed_the_rendered_fragment() {
    let ctx = Arc::new(AppContext::new(Config::default(), Arc::new(OneArticle)));
    let source = Arc::new(CountingSource::default());
    let shutdown = CancellationToken::new();
    let mut tasks = BackgroundTasks::new(&ctx, Arc::new(FixedStats), source.clone(), &shutdown);

    tasks.start().await.expect("loops start");

    let request = Request::builder().uri("/article/intro").body(Body::empty()).expect("request");
    router(Arc::clone(&ctx)).oneshot(request).await.expect("response");

    wait_until(|| ctx.storage.spans().latest().name == "Serve /article/intro").await;
    wait_until(|| {
        let html = ctx.storage.render_metrics(Duration::ZERO);
        html.contains("<p>blog.articles.served.intro: 1</p>")
            && html.contains("<p>blog.runtime.tasks.count: 7</p>")
    })
    .await;

    assert_eq!(tasks.cost_tracker().state(), CostRefreshState::Disabled);
    assert!(ctx.storage.cost_fragment().contains("Cost tracking disabled"));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);

    tasks.stop().await;
    assert!(!tasks.is_running());
}

#[tokio::test(start_paused = true)]
async fn cancelling_shutdown_stops_every_loop() {
    let ctx = Arc::new(AppContext::new(Config::default(), Arc::new(OneArticle)));
    let shutdown = CancellationToken::new();
    let mut tasks = BackgroundTasks::new(
        &ctx,
        Arc::new(FixedStats),
        Arc::new(CountingSource::default()),
        &shutdown,
    );
    tasks.start().await.expect("loops start");
    assert!(tasks.is_running());

    shutdown.cancel();
    wait_until(|| !tasks.is_running()).await;

    // stopping after cancellation is a no-op
    tasks.stop().await;
    assert!(ctx.storage.spans().take_receiver().is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_start_stops_loops_already_running() {
    let ctx = Arc::new(AppContext::new(Config::default(), Arc::new(OneArticle)));
    let shutdown = CancellationToken::new();
    let mut tasks = BackgroundTasks::new(
        &ctx,
        Arc::new(FixedStats),
        Arc::new(CountingSource::default()),
        &shutdown,
    );
    let held = ctx.storage.spans().take_receiver().expect("receiver");

    let err = tasks.start().await.expect_err("span consumer cannot start");
    assert!(matches!(err, SchedulerError::StartFailed(_)), "{err:?}");
    assert!(!tasks.is_running());
    assert!(!shutdown.is_cancelled());
    drop(held);
}
