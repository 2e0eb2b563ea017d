//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONTENT_DIR, DEFAULT_COST_REFRESH_INTERVAL_SECS, DEFAULT_COST_REQUEST_TIMEOUT_SECS,
    DEFAULT_COST_SERVICES, DEFAULT_ENV, DEFAULT_EXPORT_INTERVAL_SECS,
    DEFAULT_HISTOGRAM_BOUNDARIES_MS, DEFAULT_RUNTIME_SAMPLE_INTERVAL_SECS, DEFAULT_SERVER_PORT,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_SPAN_BUFFER_CAPACITY,
};
use crate::{QuillError, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment tag attached to every log event
    pub env: String,
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub telemetry: TelemetryConfig,
    pub cost: CostConfig,
    pub logging: LoggingConfig,
    pub profiling: ProfilingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used for the sitemap line in robots.txt
    pub public_url: Option<String>,
    pub shutdown_timeout_secs: u64,
}

/// Pre-rendered article content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub dir: PathBuf,
}

/// Telemetry pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub export_interval_secs: u64,
    pub runtime_sample_interval_secs: u64,
    pub span_buffer_capacity: usize,
    pub histogram_boundaries_ms: Vec<i64>,
}

/// External cost report configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub allowed_services: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Human-readable console output instead of JSON lines
    pub pretty: bool,
    /// Optional log file; events are written there instead of stdout
    pub file: Option<PathBuf>,
}

/// Profiling configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingConfig {
    pub enabled: bool,
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: DEFAULT_ENV.to_string(),
            server: ServerConfig::default(),
            content: ContentConfig::default(),
            telemetry: TelemetryConfig::default(),
            cost: CostConfig::default(),
            logging: LoggingConfig::default(),
            profiling: ProfilingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_SERVER_PORT,
            public_url: None,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(DEFAULT_CONTENT_DIR) }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            export_interval_secs: DEFAULT_EXPORT_INTERVAL_SECS,
            runtime_sample_interval_secs: DEFAULT_RUNTIME_SAMPLE_INTERVAL_SECS,
            span_buffer_capacity: DEFAULT_SPAN_BUFFER_CAPACITY,
            histogram_boundaries_ms: DEFAULT_HISTOGRAM_BOUNDARIES_MS.to_vec(),
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_token: None,
            refresh_interval_secs: DEFAULT_COST_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_COST_REQUEST_TIMEOUT_SECS,
            allowed_services: DEFAULT_COST_SERVICES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), pretty: false, file: None }
    }
}

impl TelemetryConfig {
    pub fn export_interval(&self) -> Duration {
        Duration::from_secs(self.export_interval_secs)
    }

    pub fn runtime_sample_interval(&self) -> Duration {
        Duration::from_secs(self.runtime_sample_interval_secs)
    }
}

impl CostConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Check cross-field requirements that serde defaults cannot express.
    ///
    /// # Errors
    /// Returns `QuillError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.env.trim().is_empty() {
            return Err(missing("env"));
        }
        if self.server.port == 0 {
            return Err(QuillError::Config("server.port must be non-zero".into()));
        }
        if self.content.dir.as_os_str().is_empty() {
            return Err(missing("content.dir"));
        }

        let telemetry = &self.telemetry;
        if telemetry.export_interval_secs == 0 || telemetry.runtime_sample_interval_secs == 0 {
            return Err(QuillError::Config("telemetry intervals must be non-zero".into()));
        }
        if telemetry.span_buffer_capacity == 0 {
            return Err(QuillError::Config(
                "telemetry.span_buffer_capacity must be non-zero".into(),
            ));
        }
        let boundaries = &telemetry.histogram_boundaries_ms;
        if boundaries.is_empty()
            || boundaries[0] <= 0
            || boundaries.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(QuillError::Config(
                "telemetry.histogram_boundaries_ms must be positive and strictly ascending".into(),
            ));
        }

        if self.cost.enabled {
            let endpoint = self
                .cost
                .endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| {
                    QuillError::Config(
                        "cost.endpoint must be set when cost tracking is enabled".into(),
                    )
                })?;
            url::Url::parse(endpoint).map_err(|e| {
                QuillError::Config(format!("cost.endpoint is not a valid URL: {e}"))
            })?;
            if self.cost.refresh_interval_secs == 0 {
                return Err(QuillError::Config(
                    "cost.refresh_interval_secs must be non-zero".into(),
                ));
            }
        }

        if self.profiling.enabled && self.profiling.report_path.is_none() {
            return Err(QuillError::Config(
                "profiling.report_path must be set when profiling is enabled".into(),
            ));
        }

        Ok(())
    }
}

fn missing(field: &str) -> QuillError {
    QuillError::Config(format!("missing required configuration: {field}"))
}
