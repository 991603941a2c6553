//! Error types for the portkeeper-core library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for portkeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The supervisor step an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Evicting whatever currently listens on the port.
    Evict,
    /// Stopping the self-managed process.
    Stop,
    /// Spawning and confirming a fresh instance.
    Launch,
    /// Start requested by the caller.
    Start,
    /// Restart requested by the caller.
    Restart,
    /// Force start at application startup.
    ForceStart,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Evict => "evicting port occupant",
            Phase::Stop => "stopping managed process",
            Phase::Launch => "launching managed process",
            Phase::Start => "start",
            Phase::Restart => "restart",
            Phase::ForceStart => "force start",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while supervising the managed process.
#[derive(Error, Debug)]
pub enum Error {
    /// The managed executable could not be resolved on the search path.
    #[error("executable '{executable}' not found in PATH: {reason}")]
    ExecutableNotFound { executable: String, reason: String },

    /// The startup script could not be written.
    #[error("failed to write startup script {}: {source}", path.display())]
    ScriptWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The managed process could not be spawned.
    #[error("failed to spawn '{executable}': {source}")]
    SpawnFailed {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The managed process exited inside the launch window and nothing took the port.
    #[error("process {pid} exited unexpectedly ({status}); check the managed process output")]
    ProcessExitedUnexpectedly { pid: u32, status: String },

    /// Failed to kill a process.
    #[error("failed to terminate process {pid}: {reason}")]
    TerminationFailed { pid: u32, reason: String },

    /// A start was requested while an instance is running.
    #[error("already running on port {port}")]
    AlreadyRunning { port: u16 },

    /// The port could not be cleared.
    #[error("port {port} is still occupied: {reason}")]
    PortStillOccupied { port: u16, reason: String },

    /// The OS socket table could not be queried.
    #[error("port inspection failed: {0}")]
    InspectionFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error wrapped with the step it happened in.
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the phase it occurred in.
    pub fn during(self, phase: Phase) -> Self {
        Error::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all phase context stripped.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Phase { source, .. } = current {
            current = source;
        }
        current
    }

    /// The outermost-first list of phases this error passed through.
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases = Vec::new();
        let mut current = self;
        while let Error::Phase { phase, source } = current {
            phases.push(*phase);
            current = source;
        }
        phases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wrapping() {
        let err = Error::ExecutableNotFound {
            executable: "q".to_string(),
            reason: "cannot find binary path".to_string(),
        }
        .during(Phase::Launch)
        .during(Phase::ForceStart);

        assert!(matches!(err.root(), Error::ExecutableNotFound { .. }));
        assert_eq!(err.phases(), vec![Phase::ForceStart, Phase::Launch]);

        let msg = err.to_string();
        assert!(msg.starts_with("force start failed: launching managed process failed"));
        assert!(msg.contains("'q' not found"));
    }

    #[test]
    fn test_root_of_unwrapped_error() {
        let err = Error::AlreadyRunning { port: 5555 };
        assert!(matches!(err.root(), Error::AlreadyRunning { port: 5555 }));
        assert!(err.phases().is_empty());
    }
}
