//! Unix process termination using `kill(2)`.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ports::ProcessTerminatorPort;

/// Unix terminator sending `SIGKILL`.
#[derive(Debug, Default)]
pub struct UnixTerminator;

impl UnixTerminator {
    /// Create a new UnixTerminator instance
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTerminatorPort for UnixTerminator {
    async fn terminate(&self, pid: u32) -> Result<()> {
        // 0 and negative values address process groups, 1 is init
        let raw = match i32::try_from(pid) {
            Ok(raw) if raw > 1 => raw,
            _ => {
                return Err(Error::TerminationFailed {
                    pid,
                    reason: "refusing to signal this PID".to_string(),
                })
            }
        };

        debug!(pid, "Sending SIGKILL");

        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(Error::TerminationFailed {
                pid,
                reason: "no such process".to_string(),
            }),
            Err(Errno::EPERM) => {
                warn!(pid, "Permission denied to kill process");
                Err(Error::TerminationFailed {
                    pid,
                    reason: "permission denied".to_string(),
                })
            }
            Err(e) => Err(Error::TerminationFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}
