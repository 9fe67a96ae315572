use std::io;

use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Used when the platform cannot report its scheduler tick rate.
pub const DEFAULT_CLOCK_TICKS: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Cooperative stop the process may catch or ignore.
    Term,
    /// Non-ignorable stop.
    Kill,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }
}

pub trait PlatformExtensions {
    fn clock_ticks_per_second() -> u64;
    fn process_exists(pid: u32) -> bool;
    fn send_signal(pid: u32, signal: Signal) -> io::Result<()>;
}

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod fallback;

#[cfg(unix)]
use unix as platform_impl;
#[cfg(not(unix))]
use fallback as platform_impl;

pub fn clock_ticks_per_second() -> u64 {
    platform_impl::Platform::clock_ticks_per_second()
}

pub fn process_exists(pid: u32) -> bool {
    platform_impl::Platform::process_exists(pid)
}

pub fn send_signal(pid: u32, signal: Signal) -> io::Result<()> {
    platform_impl::Platform::send_signal(pid, signal)
}

/// Logical CPUs visible to the scheduler, never less than 1.
pub fn core_count() -> usize {
    let sys = System::new_with_specifics(RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()));
    match sys.cpus().len() {
        0 => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_do_not_panic_for_current_pid() {
        let pid = std::process::id();
        assert!(process_exists(pid));
        assert!(clock_ticks_per_second() > 0);
        assert!(core_count() >= 1);
    }

    #[test]
    fn unused_pid_does_not_exist() {
        assert!(!process_exists(u32::MAX));
        assert!(!process_exists(0));
    }
}
