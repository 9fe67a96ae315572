use std::time::SystemTime;

use serde::Serialize;

use super::process::ProcessRecord;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HostMetrics {
    pub cpu_usage_percent: f32,
    pub memory_usage_percent: f32,
    pub memory_total_kb: u64,
    pub memory_available_kb: u64,
    pub core_count: usize,
}

/// One complete refresh. Never mutated after the collector hands it out;
/// consumers share it behind an `Arc`.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub captured_at: SystemTime,
    pub host: HostMetrics,
    pub processes: Vec<ProcessRecord>,
}

impl Snapshot {
    /// Placeholder published before the first refresh completes.
    pub fn empty() -> Self {
        Snapshot {
            sequence: 0,
            captured_at: SystemTime::now(),
            host: HostMetrics::default(),
            processes: Vec::new(),
        }
    }

    pub fn process(&self, pid: u32) -> Option<&ProcessRecord> {
        self.processes.iter().find(|p| p.pid == pid)
    }
}
