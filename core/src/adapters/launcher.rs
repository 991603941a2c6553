//! Launcher for the managed process.
//!
//! Spawns `<executable> <script>` with piped output, hands the child to a
//! background watcher that reaps it, and waits a short window to tell a
//! fast failure (bad script, port taken, missing library) from a start.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    is_startup_confirmation, ExitReport, ExitSender, InstallationReport, ManagedProcessHandle,
};
use crate::error::{Error, Result};
use crate::ports::{LaunchRequest, ProcessLauncherPort};

/// Upper bound for the installation probe.
const INSTALL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which output pipe a line came from.
#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Spawns the managed process from a generated startup script.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    script_dir: PathBuf,
}

impl ProcessLauncher {
    /// Create a launcher writing scripts to the OS temp directory.
    pub fn new() -> Self {
        Self {
            script_dir: std::env::temp_dir(),
        }
    }

    /// Create a launcher writing scripts to `script_dir`.
    pub fn with_script_dir(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
        }
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncherPort for ProcessLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<ManagedProcessHandle> {
        // Resolve first so a missing executable leaves no script behind
        let executable = resolve_executable(&request.executable)?;

        let script_path = self.script_dir.join(&request.script.file_name);
        fs::write(&script_path, &request.script.contents)
            .await
            .map_err(|source| Error::ScriptWriteFailed {
                path: script_path.clone(),
                source,
            })?;

        info!(
            executable = %executable.display(),
            script = %script_path.display(),
            "Spawning managed process"
        );

        let mut child = Command::new(&executable)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::SpawnFailed {
                executable: request.executable.clone(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| Error::SpawnFailed {
            executable: request.executable.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "process has no PID"),
        })?;

        let (handle, exit_tx) = ManagedProcessHandle::channel(pid);
        let launch_id = handle.launch_id();

        let mut output = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            output.push(tokio::spawn(forward_output(stdout, pid, launch_id, OutputStream::Stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            output.push(tokio::spawn(forward_output(stderr, pid, launch_id, OutputStream::Stderr)));
        }
        tokio::spawn(watch_exit(child, exit_tx, pid, launch_id));

        let handle = handle.with_output(output);
        info!(pid, %launch_id, window = ?request.window, "Waiting for managed process to settle");

        // Only the wait is abandoned when the timer wins; the watcher task
        // keeps running so the process can still be reaped on stop.
        tokio::select! {
            report = handle.wait_for_exit() => {
                warn!(pid, %launch_id, status = %report, "Managed process exited within launch window");
            }
            _ = sleep(request.window) => {
                info!(pid, %launch_id, "Managed process is running");
            }
        }

        Ok(handle)
    }

    async fn check_installation(&self, executable: &str, probe_args: &[String]) -> InstallationReport {
        let path = match which::which(executable) {
            Ok(path) => path,
            Err(e) => {
                return InstallationReport::Error {
                    executable: executable.to_string(),
                    reason: format!(
                        "not found in PATH ({}); install it and make sure it is on PATH",
                        e
                    ),
                    output: String::new(),
                }
            }
        };

        info!(path = %path.display(), "Found managed executable");

        let probe = Command::new(&path)
            .args(probe_args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match timeout(INSTALL_PROBE_TIMEOUT, probe).await {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));

                if output.status.success() {
                    InstallationReport::Ok {
                        executable: executable.to_string(),
                        path,
                        output: combined,
                    }
                } else {
                    InstallationReport::Error {
                        executable: executable.to_string(),
                        reason: format!("failed to execute a simple test ({})", output.status),
                        output: combined,
                    }
                }
            }
            Ok(Err(e)) => InstallationReport::Error {
                executable: executable.to_string(),
                reason: format!("failed to execute a simple test: {}", e),
                output: String::new(),
            },
            Err(_) => InstallationReport::Error {
                executable: executable.to_string(),
                reason: format!("test did not finish within {:?}", INSTALL_PROBE_TIMEOUT),
                output: String::new(),
            },
        }
    }
}

/// Resolve an executable name on the search path.
fn resolve_executable(executable: &str) -> Result<PathBuf> {
    which::which(executable).map_err(|e| Error::ExecutableNotFound {
        executable: executable.to_string(),
        reason: e.to_string(),
    })
}

/// Reap the child and publish how it ended.
async fn watch_exit(mut child: Child, exit: ExitSender, pid: u32, launch_id: Uuid) {
    let report = match child.wait().await {
        Ok(status) => ExitReport::from(status),
        Err(e) => ExitReport::wait_failed(&e),
    };
    info!(pid, %launch_id, status = %report, "Managed process exited");
    exit.send_replace(Some(report));
}

/// Forward the process output to the log, line by line.
async fn forward_output<R>(reader: R, pid: u32, launch_id: Uuid, stream: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match stream {
                OutputStream::Stdout => {
                    info!(target: "managed", pid, "{}", line);
                    if is_startup_confirmation(&line) {
                        info!(pid, %launch_id, "Managed process confirmed startup");
                    }
                }
                OutputStream::Stderr => warn!(target: "managed", pid, "{}", line),
            },
            Ok(None) => break,
            Err(e) => {
                debug!(pid, ?stream, error = %e, "Stopped reading managed process output");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::adapters::ProcessTerminator;
    use crate::domain::StartupScript;
    use crate::ports::ProcessTerminatorPort;
    use tempfile::tempdir;

    fn sh_request(contents: &str, window: Duration) -> LaunchRequest {
        LaunchRequest {
            executable: "sh".to_string(),
            script: StartupScript {
                file_name: "init.sh".to_string(),
                contents: contents.to_string(),
            },
            window,
        }
    }

    #[tokio::test]
    async fn test_missing_executable_writes_no_script() {
        let dir = tempdir().unwrap();
        let launcher = ProcessLauncher::with_script_dir(dir.path());

        let mut request = sh_request("exit 0\n", Duration::from_millis(100));
        request.executable = "portkeeper-missing-executable".to_string();

        let err = launcher.launch(request).await.unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
        assert!(!dir.path().join("init.sh").exists());
    }

    #[tokio::test]
    async fn test_script_write_failed() {
        let dir = tempdir().unwrap();
        let launcher = ProcessLauncher::with_script_dir(dir.path().join("missing"));

        let err = launcher
            .launch(sh_request("exit 0\n", Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScriptWriteFailed { .. }));
    }

    #[tokio::test]
    async fn test_early_exit_reported() {
        let dir = tempdir().unwrap();
        let launcher = ProcessLauncher::with_script_dir(dir.path());

        let handle = launcher
            .launch(sh_request("exit 3\n", Duration::from_secs(5)))
            .await
            .unwrap();

        assert!(!handle.is_alive());
        assert_eq!(handle.exit_report().unwrap().code, Some(3));
        // The script file is kept at its fixed name
        assert!(dir.path().join("init.sh").exists());
    }

    #[tokio::test]
    async fn test_survivor_is_reapable_after_window() {
        let dir = tempdir().unwrap();
        let launcher = ProcessLauncher::with_script_dir(dir.path());

        let handle = launcher
            .launch(sh_request("echo '[OK] up'\nexec sleep 30\n", Duration::from_millis(200)))
            .await
            .unwrap();

        assert!(handle.is_alive());
        assert!(handle.is_self_managed());

        ProcessTerminator::new().terminate(handle.pid()).await.unwrap();
        let report = handle.wait_for_exit().await;
        assert_eq!(report.code, None);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_output_drained_after_exit() {
        let dir = tempdir().unwrap();
        let launcher = ProcessLauncher::with_script_dir(dir.path());

        let mut handle = launcher
            .launch(sh_request("echo '[OK] up'\necho warn >&2\n", Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(handle.wait_for_exit().await.code, Some(0));
        let drained = timeout(Duration::from_secs(5), handle.drain_output())
            .await
            .unwrap();
        assert_eq!(drained, 2);
    }

    #[tokio::test]
    async fn test_check_installation() {
        let launcher = ProcessLauncher::new();

        let report = launcher
            .check_installation("sh", &["-c".to_string(), "echo 4".to_string()])
            .await;
        match report {
            InstallationReport::Ok { output, .. } => assert_eq!(output, "4\n"),
            other => panic!("unexpected report: {}", other),
        }

        let report = launcher
            .check_installation("sh", &["-c".to_string(), "echo boom >&2; exit 2".to_string()])
            .await;
        match report {
            InstallationReport::Error { output, .. } => assert_eq!(output, "boom\n"),
            other => panic!("unexpected report: {}", other),
        }

        let report = launcher.check_installation("portkeeper-missing-executable", &[]).await;
        assert!(!report.is_ok());
        assert!(report.to_string().starts_with("ERROR: 'portkeeper-missing-executable' not found"));
    }
}
