//! Throwaway procfs trees for tests that go through [`ProcFs`].

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub struct FixtureProc {
    dir: TempDir,
}

pub struct FixtureProcess<'a> {
    pub pid: u32,
    pub name: &'a str,
    pub state: char,
    pub vm_size_kb: Option<u64>,
    pub threads: u32,
    pub utime: u64,
    pub stime: u64,
    pub start_time: u64,
}

impl<'a> FixtureProcess<'a> {
    pub fn new(pid: u32, name: &'a str) -> Self {
        FixtureProcess {
            pid,
            name,
            state: 'S',
            vm_size_kb: Some(10_240),
            threads: 1,
            utime: 0,
            stime: 0,
            start_time: 0,
        }
    }
}

impl FixtureProc {
    /// 8 GiB host with 2 GiB available, 100 s uptime and an idle CPU line.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = FixtureProc { dir };
        fixture.write_meminfo(8 * 1024 * 1024, 2 * 1024 * 1024);
        fixture.write_cpu_line(&[100, 0, 100, 800, 0, 0, 0, 0]);
        fixture.write_uptime(100.0);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_meminfo(&self, total_kb: u64, available_kb: u64) {
        let text = format!(
            "MemTotal:       {total_kb} kB\nMemFree:          123456 kB\n\
             MemAvailable:   {available_kb} kB\nBuffers:           4096 kB\n"
        );
        fs::write(self.root().join("meminfo"), text).unwrap();
    }

    /// user nice system idle iowait irq softirq steal
    pub fn write_cpu_line(&self, ticks: &[u64; 8]) {
        let fields: Vec<String> = ticks.iter().map(u64::to_string).collect();
        let text = format!(
            "cpu  {} 0 0\ncpu0 {} 0 0\nintr 0\nctxt 0\n",
            fields.join(" "),
            fields.join(" ")
        );
        fs::write(self.root().join("stat"), text).unwrap();
    }

    pub fn write_uptime(&self, seconds: f64) {
        fs::write(self.root().join("uptime"), format!("{seconds:.2} 0.00\n")).unwrap();
    }

    pub fn add_process(&self, process: &FixtureProcess<'_>) {
        let mut status = format!(
            "Name:\t{}\nUmask:\t0022\nState:\t{} (fixture)\nTgid:\t{}\nPid:\t{}\n",
            process.name, process.state, process.pid, process.pid
        );
        if let Some(kb) = process.vm_size_kb {
            status.push_str(&format!("VmPeak:\t{kb:>8} kB\nVmSize:\t{kb:>8} kB\n"));
        }
        status.push_str(&format!("Threads:\t{}\n", process.threads));

        // Fields 4..=13 and 16..=21 are filler; only utime, stime,
        // num_threads and starttime matter here.
        let stat = format!(
            "{pid} ({name}) {state} 1 {pid} {pid} 0 -1 4194560 120 0 0 0 {utime} {stime} 0 0 20 0 {threads} 0 {start} 12345678 345 18446744073709551615\n",
            pid = process.pid,
            name = process.name,
            state = process.state,
            utime = process.utime,
            stime = process.stime,
            threads = process.threads,
            start = process.start_time,
        );

        self.add_raw(process.pid, &status, &stat);
    }

    pub fn add_raw(&self, pid: u32, status: &str, stat: &str) {
        self.add_raw_bytes(pid, status.as_bytes(), stat.as_bytes());
    }

    /// Writes the files verbatim, for contents that are not valid UTF-8.
    pub fn add_raw_bytes(&self, pid: u32, status: &[u8], stat: &[u8]) {
        let dir = self.root().join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        fs::write(dir.join("stat"), stat).unwrap();
    }

    pub fn remove_process(&self, pid: u32) {
        fs::remove_dir_all(self.root().join(pid.to_string())).unwrap();
    }

    /// Non-numeric entries that share the directory with pid entries.
    pub fn add_noise(&self) {
        fs::create_dir_all(self.root().join("self")).unwrap();
        fs::create_dir_all(self.root().join("sys")).unwrap();
        fs::write(self.root().join("version"), "Linux fixture\n").unwrap();
    }
}
