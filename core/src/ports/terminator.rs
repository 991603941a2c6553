//! Process terminator port (interface).

use std::future::Future;

use crate::error::Result;

/// Port for killing processes.
///
/// Termination is always forced: the managed process is not assumed to
/// handle a graceful shutdown signal.
pub trait ProcessTerminatorPort: Send + Sync {
    /// Force kill a process by PID.
    ///
    /// Fails with `TerminationFailed` when the OS refuses (permission
    /// denied, no such process). Does not wait for the port to be released.
    fn terminate(&self, pid: u32) -> impl Future<Output = Result<()>> + Send;
}
