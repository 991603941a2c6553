//! Supervisor application service.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::adapters::{PortInspector, ProcessLauncher, ProcessTerminator};
use crate::config::SupervisorConfig;
use crate::domain::{
    ExitReport, InstallationReport, ManagedProcessHandle, ServiceStatus, StartupScript,
    SupervisorState,
};
use crate::error::{Error, Phase, Result};
use crate::ports::{LaunchRequest, PortInspectorPort, ProcessLauncherPort, ProcessTerminatorPort};

/// Upper bound on flushing the last output lines of a stopped process.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Keeps exactly one instance of the managed server on the configured port.
///
/// The supervisor owns at most one [`ManagedProcessHandle`] and derives its
/// state from that handle and a fresh port scan on every call. Operations
/// take `&mut self`; callers serialize them.
pub struct Supervisor<I, T, L>
where
    I: PortInspectorPort,
    T: ProcessTerminatorPort,
    L: ProcessLauncherPort,
{
    config: SupervisorConfig,
    inspector: I,
    terminator: T,
    launcher: L,
    handle: Option<ManagedProcessHandle>,
}

/// Supervisor wired to the OS adapters of the current platform.
pub type DefaultSupervisor = Supervisor<PortInspector, ProcessTerminator, ProcessLauncher>;

impl DefaultSupervisor {
    /// Create a supervisor using the platform adapters.
    pub fn with_defaults(config: SupervisorConfig) -> Self {
        let launcher = ProcessLauncher::with_script_dir(config.script_dir());
        Self::new(config, PortInspector::new(), ProcessTerminator::new(), launcher)
    }
}

impl<I, T, L> Supervisor<I, T, L>
where
    I: PortInspectorPort,
    T: ProcessTerminatorPort,
    L: ProcessLauncherPort,
{
    pub fn new(config: SupervisorConfig, inspector: I, terminator: T, launcher: L) -> Self {
        Self {
            config,
            inspector,
            terminator,
            launcher,
            handle: None,
        }
    }

    /// The settings this supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// The current handle, if this supervisor launched the running instance.
    pub fn handle(&self) -> Option<&ManagedProcessHandle> {
        self.handle.as_ref()
    }

    /// Derive the current state.
    ///
    /// A handle whose process has exited is dropped here.
    pub async fn state(&mut self) -> SupervisorState {
        let port = self.port();

        if let Some(handle) = &self.handle {
            if handle.is_alive() {
                return SupervisorState::RunningSelfManaged { pid: handle.pid() };
            }

            let report = handle.exit_report().unwrap_or_else(ExitReport::unknown);
            info!(
                port,
                pid = handle.pid(),
                launch_id = %handle.launch_id(),
                status = %report,
                "Managed process has exited"
            );
            self.handle = None;
        }

        if self.inspector.is_listening(port).await {
            SupervisorState::RunningExternallyOwned
        } else {
            SupervisorState::Stopped
        }
    }

    pub async fn status(&mut self) -> ServiceStatus {
        self.state().await.status()
    }

    /// Start the managed server unless an instance is already serving the port.
    pub async fn start(&mut self) -> Result<()> {
        let port = self.port();
        if self.state().await.is_running() {
            warn!(port, "Start requested while already running");
            return Err(Error::AlreadyRunning { port }.during(Phase::Start));
        }

        self.launch().await.map_err(|e| e.during(Phase::Start))
    }

    /// Stop the self-managed instance, if any.
    ///
    /// Waits until the process is reaped. Never touches a port occupant this
    /// supervisor did not launch.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut handle) = self.handle.take() else {
            debug!(port = self.port(), "No managed process to stop");
            return Ok(());
        };

        let pid = handle.pid();
        if !handle.is_alive() {
            info!(pid, "Managed process already exited");
            return Ok(());
        }

        info!(pid, launch_id = %handle.launch_id(), "Stopping managed process");
        if let Err(e) = self.terminator.terminate(pid).await {
            if handle.is_alive() {
                self.handle = Some(handle);
                return Err(e.during(Phase::Stop));
            }
            debug!(pid, error = %e, "Process exited before it could be terminated");
        }

        let report = handle.wait_for_exit().await;
        if timeout(OUTPUT_DRAIN_TIMEOUT, handle.drain_output()).await.is_err() {
            debug!(pid, "Managed process output still open after exit");
        }
        info!(pid, status = %report, "Managed process stopped");
        Ok(())
    }

    /// Clear the port of any occupant and launch a fresh instance.
    ///
    /// Used once at application startup. Each step fails fast; nothing is
    /// retried.
    pub async fn force_start(&mut self) -> Result<()> {
        self.force_start_steps()
            .await
            .map_err(|e| e.during(Phase::ForceStart))
    }

    async fn force_start_steps(&mut self) -> Result<()> {
        let port = self.port();
        info!(port, "Force starting managed server");

        if self.inspector.is_listening(port).await {
            self.evict(port).await.map_err(|e| e.during(Phase::Evict))?;
        }

        if self.handle.is_some() {
            self.stop().await?;
            sleep(self.config.stop_settle()).await;
        }

        self.launch().await
    }

    /// Stop, wait, then start again.
    ///
    /// A failed stop is logged and the start still runs. External occupants
    /// are not evicted, so they make the start fail with `AlreadyRunning`.
    pub async fn restart(&mut self) -> Result<()> {
        info!(port = self.port(), "Restarting managed server");

        if let Err(e) = self.stop().await {
            warn!(error = %e, "Stop failed during restart, continuing");
        }
        sleep(self.config.restart_settle()).await;

        self.start().await.map_err(|e| e.during(Phase::Restart))
    }

    /// Address clients should connect to, or `None` when nothing is running.
    ///
    /// This is advisory only: no connection is attempted.
    pub async fn test_connection(&mut self) -> Option<String> {
        if self.state().await.is_running() {
            Some(format!("ws://localhost:{}", self.port()))
        } else {
            None
        }
    }

    /// Probe the managed executable with the configured arguments.
    pub async fn check_installation(&self) -> InstallationReport {
        self.launcher
            .check_installation(&self.config.executable, &self.config.install_probe_args)
            .await
    }

    /// Stop the self-managed instance on application exit.
    pub async fn shutdown(&mut self) {
        info!(port = self.port(), "Shutting down supervisor");
        if let Err(e) = self.stop().await {
            error!(error = %e, "Failed to stop managed process on shutdown");
        }
    }

    /// Kill whatever listens on `port` and wait for the port to clear.
    async fn evict(&mut self, port: u16) -> Result<()> {
        let pid = self
            .inspector
            .find_owner(port)
            .await?
            .ok_or_else(|| Error::PortStillOccupied {
                port,
                reason: "the owning process could not be determined".to_string(),
            })?;

        warn!(port, pid, "Evicting port occupant");
        self.terminator.terminate(pid).await?;

        let settle = self.config.eviction_settle();
        sleep(settle).await;

        if self.inspector.is_listening(port).await {
            return Err(Error::PortStillOccupied {
                port,
                reason: format!("still listening {:?} after terminating process {}", settle, pid),
            });
        }

        info!(port, pid, "Port occupant evicted");
        Ok(())
    }

    /// Launch a fresh instance and keep its handle if it owns the port.
    async fn launch(&mut self) -> Result<()> {
        let handle = self.spawn().await.map_err(|e| e.during(Phase::Launch))?;
        if handle.is_self_managed() {
            self.handle = Some(handle);
        }
        Ok(())
    }

    async fn spawn(&self) -> Result<ManagedProcessHandle> {
        let port = self.port();
        let request = LaunchRequest {
            executable: self.config.executable.clone(),
            script: StartupScript::generate(port, self.config.script_file_name.as_str()),
            window: self.config.launch_window(),
        };

        let mut handle = self.launcher.launch(request).await?;
        let pid = handle.pid();

        let Some(report) = handle.exit_report() else {
            info!(port, pid, launch_id = %handle.launch_id(), "Managed server started");
            return Ok(handle);
        };

        // The process died quickly. Another instance may have won the port.
        if self.inspector.is_listening(port).await {
            handle.mark_external();
            warn!(
                port,
                pid,
                status = %report,
                "Managed process exited but the port is listening, adopting the running instance"
            );
            return Ok(handle);
        }

        Err(Error::ProcessExitedUnexpectedly {
            pid,
            status: report.to_string(),
        })
    }
}
