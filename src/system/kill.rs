use std::io;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use super::platform::{self, Signal};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// How a stop request was delivered. Delivery does not imply the process
/// has exited yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Graceful,
    Forced,
}

#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("failed to kill process {pid}: {source}")]
    KillFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Signal delivery, split out so the escalation protocol can be exercised
/// without touching real processes.
pub trait Signaller {
    fn probe(&self, pid: u32) -> bool;
    fn send(&self, pid: u32, signal: Signal) -> io::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OsSignaller;

impl Signaller for OsSignaller {
    fn probe(&self, pid: u32) -> bool {
        platform::process_exists(pid)
    }

    fn send(&self, pid: u32, signal: Signal) -> io::Result<()> {
        platform::send_signal(pid, signal)
    }
}

#[derive(Clone, Debug)]
pub struct Terminator<S = OsSignaller> {
    signaller: S,
    grace_period: Duration,
}

impl Default for Terminator {
    fn default() -> Self {
        Terminator::new(OsSignaller, DEFAULT_GRACE_PERIOD)
    }
}

impl<S: Signaller> Terminator<S> {
    pub fn new(signaller: S, grace_period: Duration) -> Self {
        Terminator {
            signaller,
            grace_period,
        }
    }

    /// SIGTERM, escalating once to SIGKILL after the grace period if the
    /// first signal could not be delivered. Blocks for up to the grace period.
    pub fn terminate(&self, pid: u32) -> Result<Termination, TerminateError> {
        if !self.signaller.probe(pid) {
            return Err(TerminateError::NotFound(pid));
        }

        match self.signaller.send(pid, Signal::Term) {
            Ok(()) => {
                info!(pid, "sent SIGTERM");
                Ok(Termination::Graceful)
            }
            Err(err) => {
                warn!(pid, error = %err, "SIGTERM not delivered, escalating");
                thread::sleep(self.grace_period);
                self.send_forceful(pid)
            }
        }
    }

    /// SIGKILL straight away, skipping the graceful step.
    pub fn force_kill(&self, pid: u32) -> Result<Termination, TerminateError> {
        if !self.signaller.probe(pid) {
            return Err(TerminateError::NotFound(pid));
        }
        self.send_forceful(pid)
    }

    fn send_forceful(&self, pid: u32) -> Result<Termination, TerminateError> {
        self.signaller
            .send(pid, Signal::Kill)
            .map(|()| {
                info!(pid, "sent SIGKILL");
                Termination::Forced
            })
            .map_err(|source| TerminateError::KillFailed { pid, source })
    }
}
