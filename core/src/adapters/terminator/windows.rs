//! Windows process termination using `taskkill /F`.

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ports::ProcessTerminatorPort;

/// Windows terminator using `taskkill /F /PID`.
#[derive(Debug, Default)]
pub struct WindowsTerminator;

impl WindowsTerminator {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTerminatorPort for WindowsTerminator {
    async fn terminate(&self, pid: u32) -> Result<()> {
        debug!(pid, "Running taskkill /F");

        let output = Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .output()
            .await
            .map_err(|e| Error::TerminationFailed {
                pid,
                reason: format!("failed to run taskkill: {}", e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reason = if stderr.trim().is_empty() { stdout } else { stderr };

        Err(Error::TerminationFailed {
            pid,
            reason: reason.trim().to_string(),
        })
    }
}
