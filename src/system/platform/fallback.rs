use std::io;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use super::{DEFAULT_CLOCK_TICKS, PlatformExtensions, Signal};

pub struct Platform;

fn lookup(pid: u32) -> (System, Pid) {
    let sys_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    (sys, sys_pid)
}

impl PlatformExtensions for Platform {
    fn clock_ticks_per_second() -> u64 {
        DEFAULT_CLOCK_TICKS
    }

    fn process_exists(pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        let (sys, sys_pid) = lookup(pid);
        sys.process(sys_pid).is_some()
    }

    fn send_signal(pid: u32, signal: Signal) -> io::Result<()> {
        let (sys, sys_pid) = lookup(pid);
        let process = sys
            .process(sys_pid)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such process"))?;
        let sent = match signal {
            Signal::Term => process.kill_with(sysinfo::Signal::Term),
            Signal::Kill => Some(process.kill()),
        };
        match sent {
            Some(true) => Ok(()),
            Some(false) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("failed to send {} to PID {pid}", signal.name()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not supported on this platform", signal.name()),
            )),
        }
    }
}
