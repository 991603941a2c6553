//! Handle to the managed process.

use std::process::ExitStatus;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How the managed process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Human readable description (e.g., "exit status: 1").
    pub description: String,
}

impl ExitReport {
    /// Exit report for a process whose watcher went away without reporting.
    pub fn unknown() -> Self {
        Self {
            code: None,
            description: "exit status unknown".to_string(),
        }
    }

    /// Exit report for a failed wait on the child.
    pub fn wait_failed(err: &std::io::Error) -> Self {
        Self {
            code: None,
            description: format!("wait failed: {}", err),
        }
    }
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            description: status.to_string(),
        }
    }
}

impl std::fmt::Display for ExitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

/// Sender half paired with a handle's exit channel.
pub type ExitSender = watch::Sender<Option<ExitReport>>;

/// Handle to a launched instance of the managed process.
///
/// The child itself is owned by a background watcher that reaps it and
/// publishes the result on a watch channel. The handle only observes that
/// channel, so dropping or racing it never cancels the reap.
#[derive(Debug)]
pub struct ManagedProcessHandle {
    launch_id: Uuid,
    pid: u32,
    self_managed: bool,
    exit: watch::Receiver<Option<ExitReport>>,
    output: Vec<JoinHandle<()>>,
}

impl ManagedProcessHandle {
    /// Create a self-managed handle for `pid`, returning the sender the
    /// watcher uses to report the exit.
    pub fn channel(pid: u32) -> (Self, ExitSender) {
        let (tx, rx) = watch::channel(None);
        (Self::new(pid, rx), tx)
    }

    /// Create a self-managed handle observing `exit`.
    pub fn new(pid: u32, exit: watch::Receiver<Option<ExitReport>>) -> Self {
        Self {
            launch_id: Uuid::new_v4(),
            pid,
            self_managed: true,
            exit,
            output: Vec::new(),
        }
    }

    /// Attach the tasks forwarding the process output.
    pub fn with_output(mut self, output: Vec<JoinHandle<()>>) -> Self {
        self.output = output;
        self
    }

    /// Identifier correlating log lines of this launch.
    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    /// OS process ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether this launch is what occupies the port.
    pub fn is_self_managed(&self) -> bool {
        self.self_managed
    }

    /// Mark the port as owned by some other instance.
    pub fn mark_external(&mut self) {
        self.self_managed = false;
    }

    /// The exit report, once the process has exited.
    pub fn exit_report(&self) -> Option<ExitReport> {
        self.exit.borrow().clone()
    }

    /// Whether the process is still running.
    pub fn is_alive(&self) -> bool {
        // A closed channel without a report means the watcher is gone.
        self.exit.borrow().is_none() && self.exit.has_changed().is_ok()
    }

    /// Wait until the watcher has reaped the process.
    pub async fn wait_for_exit(&self) -> ExitReport {
        let mut rx = self.exit.clone();
        let result = match rx.wait_for(|report| report.is_some()).await {
            Ok(report) => (*report).clone(),
            Err(_) => self.exit.borrow().clone(),
        };
        result.unwrap_or_else(ExitReport::unknown)
    }

    /// Wait for the output forwarding tasks to reach end of stream.
    ///
    /// Returns the number of tasks drained. A child that left its pipes open
    /// in a grandchild keeps this pending, so callers bound it.
    pub async fn drain_output(&mut self) -> usize {
        let tasks = std::mem::take(&mut self.output);
        let count = tasks.len();
        for task in tasks {
            let _ = task.await;
        }
        count
    }
}
