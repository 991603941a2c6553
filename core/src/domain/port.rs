//! Listening socket and port binding domain models.

use serde::{Deserialize, Serialize};

// ============================================================================
// ListeningSocket
// ============================================================================

/// One row of the OS table of listening TCP sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListeningSocket {
    /// The port number (e.g., 5555).
    pub port: u16,
    /// Process ID owning the socket, when the OS reports it.
    ///
    /// `ss` omits the process column for sockets owned by other users
    /// unless run as root, so this can be missing on an occupied port.
    pub pid: Option<u32>,
    /// Local address the socket is bound to (e.g., "*", "127.0.0.1", "::1").
    pub address: String,
    /// Name of the owning process, when known.
    pub process_name: Option<String>,
}

impl ListeningSocket {
    /// Create a listening socket row.
    pub fn new(port: u16, pid: Option<u32>, address: impl Into<String>) -> Self {
        Self {
            port,
            pid,
            address: address.into(),
            process_name: None,
        }
    }

    /// Attach the owning process name.
    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }
}

impl std::fmt::Display for ListeningSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pid = self
            .pid
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        let name = self.process_name.as_deref().unwrap_or("unknown");
        write!(f, "{}:{} (PID: {}, Process: {})", self.address, self.port, pid, name)
    }
}

// ============================================================================
// PortBinding
// ============================================================================

/// The occupancy of a single port, derived from a fresh scan.
///
/// Never cache this: a stale binding leads to double binds or killing
/// the wrong process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub port: u16,
    pub occupied: bool,
    pub owner_pid: Option<u32>,
}

impl PortBinding {
    /// A binding for a port with nothing listening on it.
    pub fn free(port: u16) -> Self {
        Self {
            port,
            occupied: false,
            owner_pid: None,
        }
    }

    /// Derive the binding of `port` from a socket table.
    ///
    /// Only exact port matches count. The first matching row decides the
    /// owner; if that row has no PID, later rows are consulted for one.
    pub fn from_sockets(port: u16, sockets: &[ListeningSocket]) -> Self {
        let mut matching = sockets.iter().filter(|s| s.port == port).peekable();
        if matching.peek().is_none() {
            return Self::free(port);
        }

        Self {
            port,
            occupied: true,
            owner_pid: matching.find_map(|s| s.pid),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
