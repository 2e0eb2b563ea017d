//! Point-in-time view of every telemetry aggregate.

use serde::{Deserialize, Serialize};

use super::cost::CostRefreshState;

/// One shard of an attribute-split counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardValue {
    pub key: String,
    pub value: i64,
}

/// Cached request duration percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileSnapshot {
    pub p50: i64,
    pub p90: i64,
    pub p95: i64,
    pub p99: i64,
}

impl PercentileSnapshot {
    /// Values in `[p50, p90, p95, p99]` order.
    pub const fn as_array(&self) -> [i64; 4] {
        [self.p50, self.p90, self.p95, self.p99]
    }
}

/// Serializable snapshot of the telemetry store.
///
/// Shards are sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub uptime_secs: u64,
    pub articles_served: i64,
    pub articles_by_name: Vec<ShardValue>,
    pub requests_blocked: i64,
    pub blocked_by_reason: Vec<ShardValue>,
    pub robotic_visitors: i64,
    pub request_duration_ms: PercentileSnapshot,
    pub runtime_tasks: i64,
    pub memory_resident_bytes: i64,
    pub memory_virtual_bytes: i64,
    pub cost_update_success: i64,
    pub cost_update_failure: i64,
    pub cost_state: CostRefreshState,
    pub cost_fragment: String,
}
