//! Process-wide `tracing` subscriber setup.
//!
//! Events go through an [`EnvFilter`] (`RUST_LOG`, falling back to
//! `logging.level`) into either a JSON formatter or a pretty console
//! formatter. With `logging.file` set, output is written to that file
//! through a non-blocking writer instead of stdout.
//!
//! Profiling mode adds a second JSON layer that records span close events,
//! with their busy and idle time, into `profiling.report_path`.

use std::fs::File;
use std::io;
use std::path::Path;

use quill_domain::{Config, QuillError, Result};
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::errors::InfraError;

/// Keeps the non-blocking writers flushing until dropped.
///
/// Hold this for the lifetime of the process. The root span carries the
/// deployment `env`; components built inside [`LoggingGuard::in_root`]
/// inherit it, so their events are tagged with it.
#[must_use = "dropping the guard stops log output"]
pub struct LoggingGuard {
    root: Span,
    _writers: Vec<WorkerGuard>,
}

impl LoggingGuard {
    pub fn root(&self) -> &Span {
        &self.root
    }

    /// Run `f` inside the root span.
    pub fn in_root<R>(&self, f: impl FnOnce() -> R) -> R {
        self.root.in_scope(f)
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `QuillError::Io` if a log or report file cannot be opened and
/// `QuillError::Internal` if a global subscriber is already installed.
pub fn init_logging(config: &Config) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    let mut writers = Vec::with_capacity(2);

    let (writer, guard) = match &config.logging.file {
        Some(path) => tracing_appender::non_blocking(open_file(path)?),
        None => tracing_appender::non_blocking(io::stdout()),
    };
    writers.push(guard);

    let console = if config.logging.pretty {
        fmt::layer().pretty().with_writer(writer).boxed()
    } else {
        fmt::layer().json().with_current_span(true).with_span_list(true).with_writer(writer).boxed()
    };

    let profiling = match (&config.profiling.enabled, &config.profiling.report_path) {
        (true, Some(path)) => {
            let (writer, guard) = tracing_appender::non_blocking(open_file(path)?);
            writers.push(guard);
            Some(fmt::layer().json().with_span_events(FmtSpan::CLOSE).with_writer(writer))
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(profiling)
        .try_init()
        .map_err(|e| QuillError::Internal(format!("failed to install log subscriber: {e}")))?;

    let root = tracing::info_span!("quill", env = %config.env);
    tracing::debug!(
        pretty = config.logging.pretty,
        profiling = config.profiling.enabled,
        "logging initialised"
    );

    Ok(LoggingGuard { root, _writers: writers })
}

fn open_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(InfraError::from)?;
    }
    Ok(File::create(path).map_err(InfraError::from)?)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn open_file_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/nested/quill.log");

        open_file(&path).expect("log file");
        assert!(path.exists());
    }

    #[test]
    fn open_file_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as a file
        let err = open_file(dir.path()).expect_err("directory is not a file");
        assert!(matches!(err, QuillError::Io(_)));
    }
}
