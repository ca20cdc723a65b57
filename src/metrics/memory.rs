//! Process memory metrics.

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use super::{Metric, MetricsProvider, Statistic};

const PREFIX: &str = "memory.";
const RSS: &str = "memory.rss";
const VMS: &str = "memory.vms";

/// Resident and virtual memory of the current process, in bytes.
pub struct MemoryMetricsProvider {
    pid: Pid,
    system: Mutex<System>,
}

impl MemoryMetricsProvider {
    /// Returns `None` when the current process cannot be inspected on this
    /// platform.
    pub fn new() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        system.refresh_all();
        system.process(pid)?;
        Some(Self {
            pid,
            system: Mutex::new(system),
        })
    }

    fn sample(&self) -> Option<(u64, u64)> {
        let mut system = self.system.lock();
        system.refresh_all();
        let process = system.process(self.pid)?;
        Some((process.memory(), process.virtual_memory()))
    }
}

impl MetricsProvider for MemoryMetricsProvider {
    fn prefix(&self) -> &str {
        PREFIX
    }

    fn supported_names(&self) -> Vec<String> {
        vec![RSS.to_string(), VMS.to_string()]
    }

    fn metric(&self, name: &str) -> Option<Metric> {
        let (rss, vms) = self.sample()?;
        let value = match name {
            RSS => rss,
            VMS => vms,
            _ => return None,
        };
        Some(Metric::new(name, "bytes").with_measurement(Statistic::Value, value as f64))
    }
}
