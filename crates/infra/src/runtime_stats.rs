//! Process statistics backed by `sysinfo` and the tokio runtime metrics.

use parking_lot::Mutex;
use quill_core::RuntimeStatsSource;
use quill_domain::RuntimeStats;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::warn;

/// Samples the current process.
///
/// The task count comes from the runtime the caller runs on; outside a
/// runtime it reads zero. Memory figures read zero if the process table
/// cannot be queried.
pub struct SysinfoRuntimeStats {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl std::fmt::Debug for SysinfoRuntimeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoRuntimeStats").field("pid", &self.pid).finish_non_exhaustive()
    }
}

impl Default for SysinfoRuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRuntimeStats {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| warn!(error = e, "current pid unavailable, memory stats disabled"))
            .ok();
        Self { pid, system: Mutex::new(System::new()) }
    }

    fn memory(&self) -> (u64, u64) {
        let Some(pid) = self.pid else {
            return (0, 0);
        };
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map_or((0, 0), |p| (p.memory(), p.virtual_memory()))
    }
}

impl RuntimeStatsSource for SysinfoRuntimeStats {
    fn sample(&self) -> RuntimeStats {
        let tasks = tokio::runtime::Handle::try_current()
            .map(|handle| handle.metrics().num_alive_tasks() as u64)
            .unwrap_or(0);
        let (resident_bytes, virtual_bytes) = self.memory();
        RuntimeStats { tasks, resident_bytes, virtual_bytes }
    }
}
