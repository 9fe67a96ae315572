use std::io;

use super::{DEFAULT_CLOCK_TICKS, PlatformExtensions, Signal};

pub struct Platform;

/// Positive pids only: 0 and negative values address process groups.
fn target_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|&p| p > 0)
}

impl PlatformExtensions for Platform {
    fn clock_ticks_per_second() -> u64 {
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            hz as u64
        } else {
            DEFAULT_CLOCK_TICKS
        }
    }

    fn process_exists(pid: u32) -> bool {
        let Some(pid) = target_pid(pid) else {
            return false;
        };
        // Signal 0 performs the permission and existence checks only.
        if unsafe { libc::kill(pid, 0) } == 0 {
            return true;
        }
        // EPERM: the process exists but belongs to someone else.
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    fn send_signal(pid: u32, signal: Signal) -> io::Result<()> {
        let Some(pid) = target_pid(pid) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "pid does not address a single process",
            ));
        };
        let sig = match signal {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };
        if unsafe { libc::kill(pid, sig) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
