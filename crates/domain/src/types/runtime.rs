//! Process runtime statistics sampled by the runtime sampler.

use serde::{Deserialize, Serialize};

/// One sample of process-level statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Tasks currently alive on the async runtime
    pub tasks: u64,
    /// Resident set size in bytes
    pub resident_bytes: u64,
    /// Virtual memory size in bytes
    pub virtual_bytes: u64,
}
