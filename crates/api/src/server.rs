//! Startup and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quill_core::{CostError, CostSource};
use quill_domain::{Config, CostWindow, ServiceCost};
use quill_infra::{FsContentStore, HttpCostSource, LoggingGuard, SysinfoRuntimeStats};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::{AppContext, BackgroundTasks};
use crate::routes::router;

/// Run the server until a shutdown signal arrives or serving fails.
///
/// # Errors
/// Fails if the content directory cannot be read, the cost client cannot
/// be built, a background loop fails to start, the listener cannot bind
/// or the server stops with an error.
pub async fn run(config: Config, logging: &LoggingGuard) -> anyhow::Result<()> {
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let content = FsContentStore::open(&config.content.dir).with_context(|| {
        format!("failed to load articles from {}", config.content.dir.display())
    })?;
    let cost_source = cost_source(&config)?;
    let shutdown = CancellationToken::new();

    let (ctx, mut background) = logging.in_root(|| {
        let ctx = Arc::new(AppContext::new(config, Arc::new(content)));
        let background = BackgroundTasks::new(
            &ctx,
            Arc::new(SysinfoRuntimeStats::new()),
            cost_source,
            &shutdown,
        );
        (ctx, background)
    });

    if let Err(e) = background.start().await {
        shutdown.cancel();
        return Err(e).context("failed to start background loops");
    }

    let listener =
        TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, env = %ctx.config.env, "quill listening");

    let app = router(Arc::clone(&ctx));
    let drain = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app).with_graceful_shutdown(drain.cancelled_owned()).await
    });

    let served = tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            None
        }
        result = &mut server => Some(result),
    };

    shutdown.cancel();
    background.stop().await;

    let result = match served {
        Some(result) => result,
        None => match tokio::time::timeout(shutdown_timeout, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?shutdown_timeout, "connections did not drain in time");
                server.abort();
                return Ok(());
            }
        },
    };

    match result {
        Ok(Ok(())) => {
            info!("server stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "server error");
            Err(e).context("server stopped with an error")
        }
        Err(e) => Err(e).context("server task failed"),
    }
}

fn cost_source(config: &Config) -> anyhow::Result<Arc<dyn CostSource>> {
    if !config.cost.enabled {
        return Ok(Arc::new(UnconfiguredCostSource));
    }
    let source = HttpCostSource::new(&config.cost).context("failed to build cost client")?;
    Ok(Arc::new(source))
}

/// Stands in when cost tracking is off; the tracker never calls it.
struct UnconfiguredCostSource;

#[async_trait::async_trait]
impl CostSource for UnconfiguredCostSource {
    async fn costs_for_window(&self, _: CostWindow) -> Result<Vec<ServiceCost>, CostError> {
        Err(CostError::Transport("cost tracking is not configured".into()))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
