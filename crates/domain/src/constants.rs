//! Application constants
//!
//! Centralized location for metric names, default intervals and other
//! domain-level constants used throughout the application.

// Metric names emitted by the instrumentation layer
pub const METRIC_ARTICLES_SERVED: &str = "articles.served";
pub const METRIC_REQUEST_BLOCKED: &str = "request.blocked";
pub const METRIC_ROBOTIC_VISITORS: &str = "robotic.visitors";
pub const METRIC_REQUEST_DURATION: &str = "http.server.request.duration";
pub const METRIC_RUNTIME_TASKS: &str = "runtime.tasks.count";
pub const METRIC_MEMORY_RESIDENT: &str = "blog.memory.resident.bytes";
pub const METRIC_MEMORY_VIRTUAL: &str = "blog.memory.virtual.bytes";
pub const METRIC_COST_UPDATE_SUCCESS: &str = "blog.cost.update.success";
pub const METRIC_COST_UPDATE_FAILURE: &str = "blog.cost.update.failure";

// Attribute keys that shard a counter
pub const ATTR_ARTICLE: &str = "article";
pub const ATTR_BLOCKED: &str = "blocked";

// Request duration histogram
pub const DEFAULT_HISTOGRAM_BOUNDARIES_MS: [i64; 14] =
    [5, 10, 25, 50, 75, 100, 250, 500, 750, 1000, 2500, 5000, 7500, 10000];
pub const TRACKED_PERCENTILES: [u8; 4] = [50, 90, 95, 99];

// Background loop cadence
pub const DEFAULT_EXPORT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RUNTIME_SAMPLE_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_COST_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_COST_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SPAN_BUFFER_CAPACITY: usize = 10;

// Cost report
pub const COST_WINDOW_DAYS: [u32; 3] = [7, 30, 90];
pub const DEFAULT_COST_SERVICES: [&str; 4] = [
    "Amazon Lightsail",
    "AmazonCloudWatch",
    "Amazon EC2 Container Registry (ECR)",
    "Amazon Simple Storage Service",
];

// Request guard
pub const MAX_REQUEST_PATH_LENGTH: usize = 1024;
pub const BLOCK_REASON_URI_LENGTH: &str = "URI_LENGTH";
pub const BLOCK_REASON_BAD_METHOD: &str = "BAD_METHOD";
pub const BLOCK_REASON_INVALID_CHAR: &str = "INVALID_CHAR_URL";
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self'; \
     script-src-elem 'self'; style-src 'self'; img-src 'self'; connect-src 'self'";

// Server defaults
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 1;
pub const DEFAULT_ENV: &str = "development";
