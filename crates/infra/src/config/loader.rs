//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `QUILL_ENVMNT` is unset, falls back to loading from file
//! 3. Searches a fixed set of directories for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `QUILL_ENVMNT`: Deployment environment tag (required)
//! - `QUILL_SERVER_PORT`: HTTP listen port
//! - `QUILL_CONTENT_DIR`: Directory holding pre-rendered articles
//! - `QUILL_COST_TRACKING_ENABLED`: Whether cost tracking is enabled
//! - `QUILL_COST_API_URL`: Cost report endpoint
//! - `QUILL_COST_API_TOKEN`: Bearer token for the cost endpoint
//! - `QUILL_PRETTY_LOGGING`: Human-readable console logs (true/false)
//! - `QUILL_LOG_FILE`: Write logs to this file instead of stdout
//! - `QUILL_PROFILING_ENABLED`: Record span timings (true/false)
//! - `QUILL_PROFILING_REPORT`: Span timing report path
//! - `QUILL_EXPORT_INTERVAL_SECS`: Metric export interval in seconds
//!
//! Anything not set keeps its default.
//!
//! ## File Locations
//! The loader looks in the following places (in order):
//! 1. `./quill.{toml,json}` or `./config.{toml,json}` (current working
//!    directory)
//! 2. `../` and `../../` (parent directories)
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use quill_domain::{Config, QuillError, Result};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] = ["quill.toml", "quill.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `QuillError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A variable has an invalid value
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `QUILL_ENVMNT` must be present; every other variable is optional and
/// overrides the default when set.
///
/// # Errors
/// Returns `QuillError::Config` if the required variable is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config { env: env_var("QUILL_ENVMNT")?, ..Config::default() };

    if let Some(port) = env_parse::<u16>("QUILL_SERVER_PORT")? {
        config.server.port = port;
    }
    if let Some(dir) = env_opt("QUILL_CONTENT_DIR") {
        config.content.dir = PathBuf::from(dir);
    }
    if let Some(secs) = env_parse::<u64>("QUILL_EXPORT_INTERVAL_SECS")? {
        config.telemetry.export_interval_secs = secs;
    }

    config.cost.enabled = env_bool("QUILL_COST_TRACKING_ENABLED", config.cost.enabled);
    config.cost.endpoint = env_opt("QUILL_COST_API_URL").or(config.cost.endpoint);
    config.cost.api_token = env_opt("QUILL_COST_API_TOKEN").or(config.cost.api_token);

    config.logging.pretty = env_bool("QUILL_PRETTY_LOGGING", config.logging.pretty);
    config.logging.file = env_opt("QUILL_LOG_FILE").map(PathBuf::from).or(config.logging.file);

    config.profiling.enabled = env_bool("QUILL_PROFILING_ENABLED", config.profiling.enabled);
    config.profiling.report_path =
        env_opt("QUILL_PROFILING_REPORT").map(PathBuf::from).or(config.profiling.report_path);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, the first file found by [`find_config_file`] is used.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `QuillError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(QuillError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            QuillError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| QuillError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); a file
/// without an extension is treated as JSON.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let parsed: std::result::Result<Config, InfraError> = match extension {
        "toml" => toml::from_str(contents).map_err(InfraError::from),
        "json" => serde_json::from_str(contents).map_err(InfraError::from),
        _ => return Err(QuillError::Config(format!("Unsupported config format: {extension}"))),
    };
    Ok(parsed?)
}

/// Find the first configuration file in the standard locations
///
/// Searches the current working directory, its two parents, then the
/// executable's directory and its two parents.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `QuillError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| QuillError::Config(format!("Missing required environment variable: {key}")))
}

/// Optional, non-empty environment variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| QuillError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
