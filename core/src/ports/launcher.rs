//! Process launcher port (interface).

use std::future::Future;
use std::time::Duration;

use crate::domain::{InstallationReport, ManagedProcessHandle, StartupScript};
use crate::error::Result;

/// Everything needed to launch one instance of the managed process.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Executable name, resolved on the search path.
    pub executable: String,
    /// Script passed as the only argument.
    pub script: StartupScript,
    /// How long the process must survive to count as started.
    pub window: Duration,
}

/// Port for spawning the managed process.
pub trait ProcessLauncherPort: Send + Sync {
    /// Spawn the managed process and watch it for `request.window`.
    ///
    /// Fails with `ExecutableNotFound` before writing the script when the
    /// executable cannot be resolved. On success the returned handle's
    /// process is either still alive or has already exited inside the
    /// window (`exit_report()` is `Some`); deciding what an early exit
    /// means is left to the caller.
    fn launch(
        &self,
        request: LaunchRequest,
    ) -> impl Future<Output = Result<ManagedProcessHandle>> + Send;

    /// Resolve `executable` and run it once with `probe_args`.
    fn check_installation(
        &self,
        executable: &str,
        probe_args: &[String],
    ) -> impl Future<Output = InstallationReport> + Send;
}
