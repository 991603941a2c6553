//! Serve command - supervise the managed server and take commands on stdin.
//!
//! Force starts once, then reads one command per line until `quit`, end of
//! input or Ctrl-C, and stops the managed server on the way out.

use std::future::Future;
use std::io::BufRead;
use std::pin::Pin;
use std::str::FromStr;

use anyhow::Result;
use portkeeper_core::ports::{PortInspectorPort, ProcessLauncherPort, ProcessTerminatorPort};
use portkeeper_core::{ConfigStore, DefaultSupervisor, Supervisor};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{load_config, Overrides, Reply};

/// A command from the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendCommand {
    Start,
    Stop,
    Restart,
    Status,
    Port,
    Test,
    Check,
    Quit,
}

impl FromStr for FrontendCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "status" => Ok(Self::Status),
            "port" => Ok(Self::Port),
            "test" => Ok(Self::Test),
            "check" => Ok(Self::Check),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!(
                "unknown command '{}' (expected start, stop, restart, status, port, test, check or quit)",
                other
            )),
        }
    }
}

pub async fn run(store: &ConfigStore, overrides: &Overrides, json: bool) -> Result<bool> {
    let config = load_config(store, overrides).await?;
    let mut supervisor = DefaultSupervisor::with_defaults(config);

    // Polled from the force start onward so an early Ctrl-C is not lost
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        port = supervisor.port(),
        executable = %supervisor.config().executable,
        "Starting supervisor"
    );

    let (started, interrupted) =
        finish_despite_interrupt(supervisor.force_start(), ctrl_c.as_mut()).await;

    let startup = match started {
        Ok(()) => status_reply(&mut supervisor).await,
        Err(e) => {
            error!(error = %e, "Managed server unavailable");
            Reply::error("start", e.to_string())
        }
    };
    startup.print(json)?;

    if interrupted {
        supervisor.shutdown().await;
        return Ok(startup.ok);
    }

    let mut commands = spawn_stdin_reader();
    loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            line = commands.recv() => {
                let Some(line) = line else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let reply = match line.parse::<FrontendCommand>() {
                    Ok(FrontendCommand::Quit) => break,
                    Ok(command) => handle(&mut supervisor, command).await,
                    Err(message) => Reply::error("unknown", message),
                };
                if let Err(e) = reply.print(json) {
                    warn!(error = %e, "Failed to write reply");
                }
            }
        }
    }

    supervisor.shutdown().await;
    Ok(startup.ok)
}

/// Drive `work` to completion, noting whether `interrupt` fired meanwhile.
///
/// The work is never dropped half way, so a child spawned by a force start
/// is always tracked and can be stopped afterwards.
async fn finish_despite_interrupt<W, S>(work: W, mut interrupt: Pin<&mut S>) -> (W::Output, bool)
where
    W: Future,
    S: Future,
{
    tokio::pin!(work);
    let mut interrupted = false;
    loop {
        tokio::select! {
            output = &mut work => return (output, interrupted),
            _ = interrupt.as_mut(), if !interrupted => {
                info!("Interrupted during startup");
                interrupted = true;
            }
        }
    }
}

/// Read stdin lines on a plain thread.
///
/// A blocking read on the runtime's blocking pool cannot be cancelled and
/// would hold up exit after Ctrl-C.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run one front-end command against the supervisor.
pub async fn handle<I, T, L>(supervisor: &mut Supervisor<I, T, L>, command: FrontendCommand) -> Reply
where
    I: PortInspectorPort,
    T: ProcessTerminatorPort,
    L: ProcessLauncherPort,
{
    let port = supervisor.port();
    match command {
        FrontendCommand::Start => match supervisor.start().await {
            Ok(()) => Reply::ok("start", format!("Server started on port {}", port)),
            Err(e) => Reply::error("start", e.to_string()),
        },
        FrontendCommand::Stop => match supervisor.stop().await {
            Ok(()) => Reply::ok("stop", "Server stopped"),
            Err(e) => Reply::error("stop", e.to_string()),
        },
        FrontendCommand::Restart => match supervisor.restart().await {
            Ok(()) => Reply::ok("restart", format!("Server restarted on port {}", port)),
            Err(e) => Reply::error("restart", e.to_string()),
        },
        FrontendCommand::Status => status_reply(supervisor).await,
        FrontendCommand::Port => Reply {
            port: Some(port),
            ..Reply::ok("port", port.to_string())
        },
        FrontendCommand::Test => match supervisor.test_connection().await {
            Some(address) => Reply {
                address: Some(address.clone()),
                ..Reply::ok("test", format!("Server is running. Connect to {}", address))
            },
            None => Reply::error("test", "Server is not running"),
        },
        FrontendCommand::Check => Reply::installation(supervisor.check_installation().await),
        FrontendCommand::Quit => Reply::ok("quit", "Bye"),
    }
}

async fn status_reply<I, T, L>(supervisor: &mut Supervisor<I, T, L>) -> Reply
where
    I: PortInspectorPort,
    T: ProcessTerminatorPort,
    L: ProcessLauncherPort,
{
    let status = supervisor.status().await;
    let pid = supervisor.handle().map(|h| h.pid());
    Reply::status(supervisor.port(), status, pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use portkeeper_core::domain::{ExitReport, ExitSender};
    use portkeeper_core::ports::LaunchRequest;
    use portkeeper_core::{
        InstallationReport, ManagedProcessHandle, PortBinding, ServiceStatus, SupervisorConfig,
    };

    #[derive(Default)]
    struct ServerState {
        /// PID bound to the supervised port.
        listener: Option<u32>,
        running: HashMap<u32, ExitSender>,
        next_pid: u32,
    }

    /// A managed server that binds the port as soon as it is launched.
    #[derive(Clone, Default)]
    struct FakeServer(Arc<Mutex<ServerState>>);

    impl PortInspectorPort for FakeServer {
        async fn inspect(&self, port: u16) -> portkeeper_core::Result<PortBinding> {
            Ok(match self.0.lock().listener {
                Some(pid) => PortBinding {
                    port,
                    occupied: true,
                    owner_pid: Some(pid),
                },
                None => PortBinding::free(port),
            })
        }
    }

    impl ProcessTerminatorPort for FakeServer {
        async fn terminate(&self, pid: u32) -> portkeeper_core::Result<()> {
            let mut state = self.0.lock();
            if state.listener == Some(pid) {
                state.listener = None;
            }
            if let Some(tx) = state.running.remove(&pid) {
                tx.send_replace(Some(ExitReport {
                    code: None,
                    description: "signal: 9 (SIGKILL)".to_string(),
                }));
            }
            Ok(())
        }
    }

    impl ProcessLauncherPort for FakeServer {
        async fn launch(
            &self,
            _request: LaunchRequest,
        ) -> portkeeper_core::Result<ManagedProcessHandle> {
            let mut state = self.0.lock();
            state.next_pid += 1;
            let pid = 4000 + state.next_pid;
            let (handle, tx) = ManagedProcessHandle::channel(pid);
            state.listener = Some(pid);
            state.running.insert(pid, tx);
            Ok(handle)
        }

        async fn check_installation(
            &self,
            executable: &str,
            _probe_args: &[String],
        ) -> InstallationReport {
            InstallationReport::Ok {
                executable: executable.to_string(),
                path: PathBuf::from("/opt/q/l64/q"),
                output: "4\n".to_string(),
            }
        }
    }

    fn supervisor(server: &FakeServer) -> Supervisor<FakeServer, FakeServer, FakeServer> {
        let config = SupervisorConfig {
            launch_window_ms: 0,
            eviction_settle_ms: 0,
            stop_settle_ms: 0,
            restart_settle_ms: 0,
            ..SupervisorConfig::default()
        };
        Supervisor::new(config, server.clone(), server.clone(), server.clone())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<FrontendCommand>(), Ok(FrontendCommand::Start));
        assert_eq!(" Restart \n".parse::<FrontendCommand>(), Ok(FrontendCommand::Restart));
        assert_eq!("exit".parse::<FrontendCommand>(), Ok(FrontendCommand::Quit));
        assert_eq!("test".parse::<FrontendCommand>(), Ok(FrontendCommand::Test));

        let err = "launch".parse::<FrontendCommand>().unwrap_err();
        assert!(err.starts_with("unknown command 'launch'"));
    }

    #[tokio::test]
    async fn test_port_and_test_while_stopped() {
        let server = FakeServer::default();
        let mut sup = supervisor(&server);

        let reply = handle(&mut sup, FrontendCommand::Port).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "5555");
        assert_eq!(reply.port, Some(5555));

        let reply = handle(&mut sup, FrontendCommand::Test).await;
        assert!(!reply.ok);
        assert_eq!(reply.message, "Server is not running");
        assert!(reply.address.is_none());

        let reply = handle(&mut sup, FrontendCommand::Status).await;
        assert_eq!(reply.status, Some(ServiceStatus::Stopped));
        assert_eq!(reply.pid, None);
    }

    #[tokio::test]
    async fn test_command_session() {
        let server = FakeServer::default();
        let mut sup = supervisor(&server);

        let reply = handle(&mut sup, FrontendCommand::Start).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Server started on port 5555");
        let first = server.0.lock().listener.unwrap();

        let reply = handle(&mut sup, FrontendCommand::Status).await;
        assert_eq!(reply.status, Some(ServiceStatus::Running));
        assert_eq!(reply.pid, Some(first));

        let reply = handle(&mut sup, FrontendCommand::Test).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Server is running. Connect to ws://localhost:5555");
        assert_eq!(reply.address.as_deref(), Some("ws://localhost:5555"));

        let reply = handle(&mut sup, FrontendCommand::Start).await;
        assert!(!reply.ok);

        let reply = handle(&mut sup, FrontendCommand::Restart).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Server restarted on port 5555");
        let second = server.0.lock().listener.unwrap();
        assert_ne!(first, second);

        let reply = handle(&mut sup, FrontendCommand::Stop).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Server stopped");
        assert!(server.0.lock().listener.is_none());
        assert!(sup.handle().is_none());

        let reply = handle(&mut sup, FrontendCommand::Check).await;
        assert!(reply.ok);
        assert!(reply.message.starts_with("OK: 'q' is installed at /opt/q/l64/q"));
        assert!(reply.installation.is_some());
    }

    #[tokio::test]
    async fn test_startup_finishes_after_interrupt() {
        let work = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "started"
        };
        let interrupt = std::future::ready(());
        tokio::pin!(interrupt);

        let (output, interrupted) = finish_despite_interrupt(work, interrupt.as_mut()).await;
        assert_eq!(output, "started");
        assert!(interrupted);
    }

    #[tokio::test]
    async fn test_startup_without_interrupt() {
        let interrupt = std::future::pending::<()>();
        tokio::pin!(interrupt);

        let (output, interrupted) =
            finish_despite_interrupt(async { 7 }, interrupt.as_mut()).await;
        assert_eq!(output, 7);
        assert!(!interrupted);
    }
}
