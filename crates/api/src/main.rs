//! Quill blog server entry point.

use anyhow::Context;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; report it once logging is up
    let dotenv = dotenvy::dotenv();

    let config = quill_infra::config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let logging = quill_infra::init_logging(&config).context("failed to initialise logging")?;
    logging.in_root(|| {
        match &dotenv {
            Ok(path) => info!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "could not load .env file"),
        }
        info!(
            version = env!("CARGO_PKG_VERSION"),
            profiling = config.profiling.enabled,
            cost_tracking = config.cost.enabled,
            "quill starting"
        );
    });

    quill_server::run(config, &logging).await
}
