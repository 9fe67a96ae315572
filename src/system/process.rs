use std::fmt;

use serde::Serialize;

/// Scheduler state as reported by the kernel's one-letter code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Sleeping,
    DiskSleep,
    Zombie,
    Stopped,
    TracingStop,
    Dead,
    Idle,
    Wakekill,
    Waking,
    Parked,
    Unknown(char),
}

impl ProcessState {
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'Z' => ProcessState::Zombie,
            'T' => ProcessState::Stopped,
            't' => ProcessState::TracingStop,
            'X' | 'x' => ProcessState::Dead,
            'I' => ProcessState::Idle,
            'K' => ProcessState::Wakekill,
            'W' => ProcessState::Waking,
            'P' => ProcessState::Parked,
            other => ProcessState::Unknown(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::DiskSleep => "disk sleep",
            ProcessState::Zombie => "zombie",
            ProcessState::Stopped => "stopped",
            ProcessState::TracingStop => "tracing stop",
            ProcessState::Dead => "dead",
            ProcessState::Idle => "idle",
            ProcessState::Wakekill => "wakekill",
            ProcessState::Waking => "waking",
            ProcessState::Parked => "parked",
            ProcessState::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One process as seen by a single refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub state: ProcessState,
    /// `None` when the kernel reports no address space (kernel threads).
    pub virtual_memory_kb: Option<u64>,
    pub thread_count: Option<u32>,
    pub cpu_usage_percent: f32,
}

impl ProcessRecord {
    /// Case-insensitive substring match against the name or the decimal pid.
    /// `needle` must already be lowercased.
    pub fn matches_filter(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.pid.to_string().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: u32, name: &str) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: name.to_string(),
            state: ProcessState::Sleeping,
            virtual_memory_kb: Some(1024),
            thread_count: Some(1),
            cpu_usage_percent: 0.0,
        }
    }

    #[test]
    fn state_codes_map_to_descriptions() {
        assert_eq!(ProcessState::from_code('R').to_string(), "running");
        assert_eq!(ProcessState::from_code('S').to_string(), "sleeping");
        assert_eq!(ProcessState::from_code('D').to_string(), "disk sleep");
        assert_eq!(ProcessState::from_code('Z').to_string(), "zombie");
        assert_eq!(ProcessState::from_code('t').to_string(), "tracing stop");
        assert_eq!(ProcessState::from_code('I').to_string(), "idle");
        assert_eq!(ProcessState::from_code('?'), ProcessState::Unknown('?'));
    }

    #[test]
    fn filter_matches_name_case_insensitively() {
        let p = record(4242, "NetworkManager");
        assert!(p.matches_filter("network"));
        assert!(p.matches_filter(""));
        assert!(!p.matches_filter("systemd"));
    }

    #[test]
    fn filter_matches_stringified_pid() {
        let p = record(4242, "bash");
        assert!(p.matches_filter("424"));
        assert!(!p.matches_filter("99"));
    }
}
