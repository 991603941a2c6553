//! Supervisor state and the projections reported to the front-end.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// State of the supervised service, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Our own launch is alive and owns the port.
    RunningSelfManaged { pid: u32 },
    /// No live handle, but something listens on the port.
    RunningExternallyOwned,
    /// No live handle and the port is free.
    Stopped,
}

impl SupervisorState {
    /// Whether any instance is serving the port.
    pub fn is_running(&self) -> bool {
        !matches!(self, SupervisorState::Stopped)
    }

    /// The status shown to the front-end.
    pub fn status(&self) -> ServiceStatus {
        if self.is_running() {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        }
    }
}

/// Status reported at the front-end boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of probing the managed executable itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum InstallationReport {
    /// The executable resolved and ran the probe successfully.
    Ok {
        executable: String,
        path: PathBuf,
        output: String,
    },
    /// The executable is missing or the probe failed.
    Error {
        executable: String,
        reason: String,
        output: String,
    },
}

impl InstallationReport {
    pub fn is_ok(&self) -> bool {
        matches!(self, InstallationReport::Ok { .. })
    }
}

impl std::fmt::Display for InstallationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallationReport::Ok {
                executable,
                path,
                output,
            } => write!(
                f,
                "OK: '{}' is installed at {}\nTest output: {}",
                executable,
                path.display(),
                output.trim_end()
            ),
            InstallationReport::Error {
                executable,
                reason,
                output,
            } => {
                write!(f, "ERROR: '{}' {}", executable, reason)?;
                if !output.trim().is_empty() {
                    write!(f, "\nOutput: {}", output.trim_end())?;
                }
                Ok(())
            }
        }
    }
}
