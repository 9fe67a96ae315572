use std::collections::HashSet;
use std::time::SystemTime;

use tracing::{debug, debug_span, warn};

use super::cpu::{CpuMode, HostCpuTracker, ProcessCpuTracker, process_cpu_percent};
use super::platform;
use super::process::{ProcessRecord, ProcessState};
use super::procfs::{CollectError, CounterSource, ProcFs, RawProcess};
use super::snapshot::{HostMetrics, Snapshot};

/// Assembles snapshots from a [`CounterSource`].
///
/// All sampling state (the previous host CPU sample and, in interval mode,
/// per-pid samples) lives here, and `build` takes `&mut self`, so one
/// collector can never run two builds at once.
pub struct Collector<S = ProcFs> {
    source: S,
    clock_ticks_per_second: u64,
    core_count: usize,
    cpu_mode: CpuMode,
    host_cpu: HostCpuTracker,
    process_cpu: ProcessCpuTracker,
    sequence: u64,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(ProcFs::default())
    }
}

impl<S: CounterSource> Collector<S> {
    pub fn new(source: S) -> Self {
        Self::with_parameters(
            source,
            platform::clock_ticks_per_second(),
            platform::core_count(),
        )
    }

    /// Explicit tick rate and core count, for sources that do not describe
    /// the running machine.
    pub fn with_parameters(source: S, clock_ticks_per_second: u64, core_count: usize) -> Self {
        Collector {
            source,
            clock_ticks_per_second: clock_ticks_per_second.max(1),
            core_count: core_count.max(1),
            cpu_mode: CpuMode::default(),
            host_cpu: HostCpuTracker::new(),
            process_cpu: ProcessCpuTracker::new(),
            sequence: 0,
        }
    }

    pub fn with_cpu_mode(mut self, mode: CpuMode) -> Self {
        self.cpu_mode = mode;
        self
    }

    pub fn build(&mut self) -> Snapshot {
        let _span = debug_span!("collector.build", sequence = self.sequence + 1).entered();

        let uptime = match self.source.read_uptime() {
            Ok(uptime) => Some(uptime),
            Err(err) => {
                warn!(error = %err, "uptime unavailable, process CPU reported as 0");
                None
            }
        };

        let pids = self.source.list_pids().unwrap_or_else(|err| {
            warn!(error = %err, "cannot enumerate processes");
            Vec::new()
        });

        let mut processes = Vec::with_capacity(pids.len());
        for pid in pids {
            match self.source.read_process(pid) {
                Ok(raw) => processes.push(self.to_record(raw, uptime)),
                Err(CollectError::ProcessVanished(_)) => {}
                Err(err) => debug!(pid, error = %err, "skipping process"),
            }
        }

        if self.cpu_mode == CpuMode::Interval {
            let alive: HashSet<u32> = processes.iter().map(|p| p.pid).collect();
            self.process_cpu.retain_alive(&alive);
        }

        let host = self.host_metrics();
        self.sequence += 1;
        debug!(processes = processes.len(), cpu = host.cpu_usage_percent, "snapshot built");

        Snapshot {
            sequence: self.sequence,
            captured_at: SystemTime::now(),
            host,
            processes,
        }
    }

    /// Without an uptime reading CPU is 0 and interval samples are left
    /// untouched, so the next good build still measures from the last one.
    fn to_record(&mut self, raw: RawProcess, uptime: Option<f64>) -> ProcessRecord {
        let cpu_usage_percent = match (uptime, self.cpu_mode) {
            (None, _) => 0.0,
            (Some(uptime), CpuMode::Lifetime) => process_cpu_percent(
                &raw.stat,
                self.clock_ticks_per_second,
                uptime,
                self.core_count,
            ),
            (Some(uptime), CpuMode::Interval) => self.process_cpu.update(
                raw.pid,
                &raw.stat,
                self.clock_ticks_per_second,
                uptime,
                self.core_count,
            ),
        };

        ProcessRecord {
            pid: raw.pid,
            name: raw.status.name.unwrap_or_default(),
            state: ProcessState::from_code(raw.status.state.unwrap_or('?')),
            virtual_memory_kb: raw.status.vm_size_kb,
            thread_count: raw.status.threads,
            cpu_usage_percent,
        }
    }

    fn host_metrics(&mut self) -> HostMetrics {
        let cpu_usage_percent = match self.source.read_cpu_times() {
            Ok(times) => self.host_cpu.update(times),
            Err(err) => {
                warn!(error = %err, "host CPU counters unavailable");
                0.0
            }
        };

        let memory = self.source.read_meminfo().unwrap_or_else(|err| {
            warn!(error = %err, "host memory counters unavailable");
            Default::default()
        });

        HostMetrics {
            cpu_usage_percent,
            memory_usage_percent: memory.usage_percent(),
            memory_total_kb: memory.total_kb,
            memory_available_kb: memory.available_kb,
            core_count: self.core_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::system::cpu::CpuTimes;
    use crate::system::procfs::{MemInfo, StatFields, StatusFields};

    /// In-memory counters; `cpu` advances by popping queued samples.
    #[derive(Default)]
    struct FakeSource {
        processes: HashMap<u32, Result<RawProcess, &'static str>>,
        order: Vec<u32>,
        cpu: RefCell<Vec<CpuTimes>>,
        memory: Option<MemInfo>,
        uptime: Option<f64>,
    }

    impl FakeSource {
        fn with_process(mut self, pid: u32, name: &str, utime: u64, start_time: u64) -> Self {
            let raw = RawProcess {
                pid,
                status: StatusFields {
                    name: Some(name.to_string()),
                    state: Some('R'),
                    vm_size_kb: Some(2048),
                    threads: Some(3),
                },
                stat: StatFields {
                    utime,
                    stime: 0,
                    start_time,
                },
            };
            self.processes.insert(pid, Ok(raw));
            self.order.push(pid);
            self
        }

        fn with_broken(mut self, pid: u32) -> Self {
            self.processes.insert(pid, Err("stat"));
            self.order.push(pid);
            self
        }
    }

    fn unavailable() -> CollectError {
        CollectError::SourceUnavailable {
            path: "fake".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    impl CounterSource for FakeSource {
        fn list_pids(&self) -> Result<Vec<u32>, CollectError> {
            Ok(self.order.clone())
        }

        fn read_process(&self, pid: u32) -> Result<RawProcess, CollectError> {
            match self.processes.get(&pid) {
                Some(Ok(raw)) => Ok(raw.clone()),
                Some(Err(record)) => Err(CollectError::MalformedRecord {
                    record: *record,
                    reason: "truncated".into(),
                }),
                None => Err(CollectError::ProcessVanished(pid)),
            }
        }

        fn read_meminfo(&self) -> Result<MemInfo, CollectError> {
            self.memory.ok_or_else(unavailable)
        }

        fn read_cpu_times(&self) -> Result<CpuTimes, CollectError> {
            let mut queue = self.cpu.borrow_mut();
            if queue.len() > 1 {
                Ok(queue.remove(0))
            } else {
                queue.first().copied().ok_or_else(unavailable)
            }
        }

        fn read_uptime(&self) -> Result<f64, CollectError> {
            self.uptime.ok_or_else(unavailable)
        }
    }

    fn cpu(busy: u64, idle: u64) -> CpuTimes {
        CpuTimes {
            user: busy,
            idle,
            ..CpuTimes::default()
        }
    }

    #[test]
    fn build_skips_processes_whose_detail_read_fails() {
        let source = FakeSource {
            uptime: Some(400.0),
            ..FakeSource::default()
        }
        .with_process(1, "init", 100, 0)
        .with_broken(2)
        .with_process(3, "bash", 10, 100);
        let mut collector = Collector::with_parameters(source, 100, 1);

        let snapshot = collector.build();
        let pids: Vec<u32> = snapshot.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 3]);
        assert_eq!(snapshot.processes[1].state, ProcessState::Running);
        assert_eq!(snapshot.processes[1].thread_count, Some(3));
    }

    #[test]
    fn build_uses_single_uptime_for_every_process() {
        let source = FakeSource {
            uptime: Some(400.0),
            ..FakeSource::default()
        }
        .with_process(10, "worker", 150, 200);
        let mut collector = Collector::with_parameters(source, 100, 1);

        let snapshot = collector.build();
        let p = snapshot.process(10).unwrap();
        assert!((p.cpu_usage_percent - 0.376_884).abs() < 1e-4);
    }

    #[test]
    fn missing_uptime_yields_zero_process_cpu() {
        let source = FakeSource::default().with_process(10, "worker", 150, 200);
        let mut collector = Collector::with_parameters(source, 100, 1);
        assert_eq!(collector.build().processes[0].cpu_usage_percent, 0.0);
    }

    #[test]
    fn interval_samples_survive_a_missing_uptime() {
        let mut collector = Collector::with_parameters(
            FakeSource {
                uptime: Some(100.0),
                ..FakeSource::default()
            }
            .with_process(10, "worker", 1_000, 0),
            100,
            1,
        )
        .with_cpu_mode(CpuMode::Interval);
        collector.build();

        collector.source.uptime = None;
        assert_eq!(collector.build().processes[0].cpu_usage_percent, 0.0);

        // 5 s of CPU over the 10 s since the last good sample.
        collector.source.uptime = Some(110.0);
        if let Some(Ok(raw)) = collector.source.processes.get_mut(&10) {
            raw.stat.utime = 1_500;
        }
        assert_eq!(collector.build().processes[0].cpu_usage_percent, 50.0);
    }

    #[test]
    fn host_sources_unavailable_degrade_to_zero() {
        let mut collector = Collector::with_parameters(FakeSource::default(), 100, 2);
        let snapshot = collector.build();
        assert_eq!(snapshot.host.cpu_usage_percent, 0.0);
        assert_eq!(snapshot.host.memory_usage_percent, 0.0);
        assert_eq!(snapshot.host.core_count, 2);
    }

    #[test]
    fn host_cpu_is_delta_between_builds() {
        let source = FakeSource {
            cpu: RefCell::new(vec![cpu(100, 100), cpu(130, 170)]),
            memory: Some(MemInfo {
                total_kb: 1000,
                available_kb: 250,
            }),
            ..FakeSource::default()
        };
        let mut collector = Collector::with_parameters(source, 100, 1);

        let first = collector.build();
        assert_eq!(first.host.cpu_usage_percent, 0.0);
        assert!((first.host.memory_usage_percent - 75.0).abs() < f32::EPSILON);

        let second = collector.build();
        assert!((second.host.cpu_usage_percent - 30.0).abs() < 1e-4);

        // No more ticks elapse: identical counters give 0.
        let third = collector.build();
        assert_eq!(third.host.cpu_usage_percent, 0.0);
        assert_eq!(third.sequence, 3);
    }

    #[test]
    fn interval_mode_reports_usage_since_previous_build() {
        let source = FakeSource {
            uptime: Some(100.0),
            ..FakeSource::default()
        }
        .with_process(5, "busy", 100, 0);
        let mut collector = Collector::with_parameters(source, 100, 1).with_cpu_mode(CpuMode::Interval);
        collector.build();

        // Half a second of CPU over one second of uptime.
        collector.source = FakeSource {
            uptime: Some(101.0),
            ..FakeSource::default()
        }
        .with_process(5, "busy", 150, 0);
        let snapshot = collector.build();
        assert!((snapshot.processes[0].cpu_usage_percent - 50.0).abs() < 1e-4);
    }

    #[test]
    fn interval_mode_forgets_exited_processes() {
        let source = FakeSource {
            uptime: Some(10.0),
            ..FakeSource::default()
        }
        .with_process(1, "a", 1, 0)
        .with_process(2, "b", 1, 0);
        let mut collector = Collector::with_parameters(source, 100, 1).with_cpu_mode(CpuMode::Interval);
        collector.build();
        assert_eq!(collector.process_cpu.len(), 2);

        collector.source = FakeSource {
            uptime: Some(12.0),
            ..FakeSource::default()
        }
        .with_process(2, "b", 1, 0);
        collector.build();
        assert_eq!(collector.process_cpu.len(), 1);
    }
}
