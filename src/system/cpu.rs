use std::collections::HashMap;

use serde::Serialize;

use super::procfs::StatFields;

/// Cumulative host tick counters from the aggregate `cpu` line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    pub fn non_idle_total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn total(&self) -> u64 {
        self.idle_total().saturating_add(self.non_idle_total())
    }
}

/// Host utilisation between two aggregate samples, in `[0, 100]`.
///
/// Returns 0 when no ticks elapsed (first sample, or two reads within the
/// same tick). Counters that went backwards are treated as no progress.
pub fn host_cpu_percent(prev: &CpuTimes, curr: &CpuTimes) -> f32 {
    let total = curr.total().saturating_sub(prev.total());
    if total == 0 {
        return 0.0;
    }
    let active = curr.non_idle_total().saturating_sub(prev.non_idle_total());
    let percent = 100.0 * active as f64 / total as f64;
    percent.clamp(0.0, 100.0) as f32
}

/// Average utilisation of one process over its whole lifetime.
///
/// This is cumulative CPU time divided by time since the process started,
/// spread across `core_count` cores. It does not reflect the last refresh
/// interval; see [`ProcessCpuTracker`] for that.
pub fn process_cpu_percent(
    stat: &StatFields,
    clock_ticks_per_second: u64,
    system_uptime_seconds: f64,
    core_count: usize,
) -> f32 {
    let hz = clock_ticks_per_second.max(1) as f64;
    let cpu_seconds = stat.busy_ticks() as f64 / hz;
    let process_uptime = system_uptime_seconds - stat.start_time as f64 / hz;
    if process_uptime <= 0.0 {
        return 0.0;
    }
    (100.0 * cpu_seconds / process_uptime / core_count.max(1) as f64) as f32
}

/// Keeps the previous aggregate sample so each read yields a delta.
#[derive(Debug, Default)]
pub struct HostCpuTracker {
    prev: Option<CpuTimes>,
}

impl HostCpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `curr` and returns utilisation since the previous call.
    /// The first call has nothing to compare against and returns 0.
    pub fn update(&mut self, curr: CpuTimes) -> f32 {
        let percent = match &self.prev {
            Some(prev) => host_cpu_percent(prev, &curr),
            None => 0.0,
        };
        self.prev = Some(curr);
        percent
    }
}

/// How per-process CPU usage is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuMode {
    /// Lifetime average since process start.
    #[default]
    Lifetime,
    /// Usage over the last refresh interval; needs per-pid history.
    Interval,
}

impl CpuMode {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "interval" | "rate" => CpuMode::Interval,
            _ => CpuMode::Lifetime,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ProcessSample {
    busy_ticks: u64,
    start_time: u64,
    uptime: f64,
}

/// Per-pid previous samples for [`CpuMode::Interval`].
#[derive(Debug, Default)]
pub struct ProcessCpuTracker {
    samples: HashMap<u32, ProcessSample>,
}

impl ProcessCpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage since the last observation of `pid`; falls back to the lifetime
    /// average on first sighting, when the pid was reused, or when no time
    /// has passed.
    pub fn update(
        &mut self,
        pid: u32,
        stat: &StatFields,
        clock_ticks_per_second: u64,
        system_uptime_seconds: f64,
        core_count: usize,
    ) -> f32 {
        if system_uptime_seconds <= 0.0 {
            return 0.0;
        }
        let current = ProcessSample {
            busy_ticks: stat.busy_ticks(),
            start_time: stat.start_time,
            uptime: system_uptime_seconds,
        };
        let previous = self.samples.insert(pid, current);

        match previous {
            Some(prev) if prev.start_time == current.start_time => {
                let elapsed = current.uptime - prev.uptime;
                if elapsed <= 0.0 {
                    return process_cpu_percent(
                        stat,
                        clock_ticks_per_second,
                        system_uptime_seconds,
                        core_count,
                    );
                }
                let ticks = current.busy_ticks.saturating_sub(prev.busy_ticks);
                let cpu_seconds = ticks as f64 / clock_ticks_per_second.max(1) as f64;
                (100.0 * cpu_seconds / elapsed / core_count.max(1) as f64) as f32
            }
            _ => process_cpu_percent(stat, clock_ticks_per_second, system_uptime_seconds, core_count),
        }
    }

    /// Drops samples for pids that were not seen in the latest scan.
    pub fn retain_alive(&mut self, alive: &std::collections::HashSet<u32>) {
        self.samples.retain(|pid, _| alive.contains(pid));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }
}
