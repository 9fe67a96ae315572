//! Readers for the kernel's text counters under a procfs root.
//!
//! Parsing is split from I/O: the `parse_*` functions are pure and operate on
//! the file contents, while [`ProcFs`] maps a root directory (normally
//! `/proc`) onto the [`CounterSource`] trait the collector consumes.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::cpu::CpuTimes;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot read {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {record} record: {reason}")]
    MalformedRecord { record: &'static str, reason: String },
    #[error("process {0} vanished during the scan")]
    ProcessVanished(u32),
}

impl CollectError {
    fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        CollectError::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }
}

/// Fields of interest from `<pid>/status`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub name: Option<String>,
    pub state: Option<char>,
    pub vm_size_kb: Option<u64>,
    pub threads: Option<u32>,
}

/// Fields of interest from `<pid>/stat`, all in clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatFields {
    pub utime: u64,
    pub stime: u64,
    pub start_time: u64,
}

impl StatFields {
    pub fn busy_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemInfo {
    pub fn usage_percent(&self) -> f32 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb - self.available_kb.min(self.total_kb);
        (100.0 * used as f64 / self.total_kb as f64) as f32
    }
}

/// Raw counters for one pid, read as a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawProcess {
    pub pid: u32,
    pub status: StatusFields,
    pub stat: StatFields,
}

pub fn parse_status(text: &str) -> StatusFields {
    let mut fields = StatusFields::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Name" if !value.is_empty() => fields.name = Some(value.to_string()),
            "State" => fields.state = value.chars().next(),
            // "VmSize:\t  123456 kB"; zero means no address space.
            "VmSize" => {
                fields.vm_size_kb = value
                    .split_whitespace()
                    .next()
                    .and_then(|n| n.parse().ok())
                    .filter(|&kb| kb > 0);
            }
            "Threads" => fields.threads = value.parse().ok(),
            _ => {}
        }
    }
    fields
}

const STAT_UTIME: usize = 14;
const STAT_STIME: usize = 15;
const STAT_STARTTIME: usize = 22;

pub fn parse_stat(text: &str) -> Result<StatFields, CollectError> {
    if text.trim().is_empty() {
        return Err(CollectError::malformed("stat", "empty record"));
    }
    // comm (field 2) is parenthesised and may itself contain spaces or ')',
    // so positions after it are counted from the last ')'. Fields past the
    // end of a short record read as 0.
    let (tokens, first_field): (Vec<&str>, usize) = match text.rfind(')') {
        Some(idx) => (text[idx + 1..].split_whitespace().collect(), 3),
        None => (text.split_whitespace().collect(), 1),
    };

    let field = |position: usize| -> Result<u64, CollectError> {
        match tokens.get(position - first_field) {
            Some(token) => token.parse().map_err(|_| {
                CollectError::malformed("stat", format!("field {position} is {token:?}"))
            }),
            None => Ok(0),
        }
    };

    Ok(StatFields {
        utime: field(STAT_UTIME)?,
        stime: field(STAT_STIME)?,
        start_time: field(STAT_STARTTIME)?,
    })
}

pub fn parse_meminfo(text: &str) -> Result<MemInfo, CollectError> {
    let mut total = None;
    let mut available = None;
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let slot = match parts.next() {
            Some("MemTotal:") => &mut total,
            Some("MemAvailable:") => &mut available,
            _ => continue,
        };
        let value = parts.next().unwrap_or_default();
        *slot = Some(value.parse::<u64>().map_err(|_| {
            CollectError::malformed("meminfo", format!("value {value:?} is not a number"))
        })?);
        if total.is_some() && available.is_some() {
            break;
        }
    }
    Ok(MemInfo {
        total_kb: total.unwrap_or(0),
        available_kb: available.unwrap_or(0),
    })
}

/// Parses the aggregate `cpu` line (the first line of `/proc/stat`).
pub fn parse_cpu_times(text: &str) -> Result<CpuTimes, CollectError> {
    let line = text
        .lines()
        .next()
        .ok_or_else(|| CollectError::malformed("cpu", "empty record"))?;
    let mut ticks = [0u64; 8];
    for (slot, token) in ticks.iter_mut().zip(line.split_whitespace().skip(1)) {
        *slot = token
            .parse()
            .map_err(|_| CollectError::malformed("cpu", format!("tick {token:?}")))?;
    }
    let [user, nice, system, idle, iowait, irq, softirq, steal] = ticks;
    Ok(CpuTimes {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
    })
}

pub fn parse_uptime(text: &str) -> Result<f64, CollectError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| CollectError::malformed("uptime", "empty record"))?;
    token
        .parse()
        .map_err(|_| CollectError::malformed("uptime", format!("{token:?} is not a number")))
}

/// Where the collector gets its raw counters from.
pub trait CounterSource {
    fn list_pids(&self) -> Result<Vec<u32>, CollectError>;
    fn read_process(&self, pid: u32) -> Result<RawProcess, CollectError>;
    fn read_meminfo(&self) -> Result<MemInfo, CollectError>;
    fn read_cpu_times(&self) -> Result<CpuTimes, CollectError>;
    fn read_uptime(&self) -> Result<f64, CollectError>;
}

#[derive(Clone, Debug)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProcFs { root: root.into() }
    }

    fn read(&self, path: PathBuf) -> Result<String, CollectError> {
        fs::read(&path)
            .map(decode)
            .map_err(|source| CollectError::SourceUnavailable { path, source })
    }

    fn read_pid_file(&self, pid: u32, file: &str) -> Result<String, CollectError> {
        let path = self.root.join(pid.to_string()).join(file);
        fs::read(&path).map(decode).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CollectError::ProcessVanished(pid),
            // ESRCH surfaces when the task is reaped between open and read.
            _ if source.raw_os_error() == Some(3) => CollectError::ProcessVanished(pid),
            _ => CollectError::SourceUnavailable { path, source },
        })
    }
}

/// The kernel copies `comm` bytes verbatim and cuts it at 15 bytes, which can
/// split a multibyte character; such names come back with U+FFFD.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

impl CounterSource for ProcFs {
    fn list_pids(&self) -> Result<Vec<u32>, CollectError> {
        let entries = fs::read_dir(&self.root).map_err(|source| CollectError::SourceUnavailable {
            path: self.root.clone(),
            source,
        })?;
        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .collect())
    }

    fn read_process(&self, pid: u32) -> Result<RawProcess, CollectError> {
        let status = parse_status(&self.read_pid_file(pid, "status")?);
        if status.name.is_none() {
            return Err(CollectError::malformed("status", "missing Name"));
        }
        if status.state.is_none() {
            return Err(CollectError::malformed("status", "missing State"));
        }
        let stat = parse_stat(&self.read_pid_file(pid, "stat")?)?;
        Ok(RawProcess { pid, status, stat })
    }

    fn read_meminfo(&self) -> Result<MemInfo, CollectError> {
        parse_meminfo(&self.read(self.root.join("meminfo"))?)
    }

    fn read_cpu_times(&self) -> Result<CpuTimes, CollectError> {
        parse_cpu_times(&self.read(self.root.join("stat"))?)
    }

    fn read_uptime(&self) -> Result<f64, CollectError> {
        parse_uptime(&self.read(self.root.join("uptime"))?)
    }
}
