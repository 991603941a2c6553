//! Port inspector adapters.
//!
//! Platform-specific scans of the listening TCP socket table. The parsers
//! are compiled on every platform so captured outputs can be tested
//! anywhere; only the dispatch below is platform-gated.

mod darwin;
mod linux;
mod utils;
mod windows;

use std::future::Future;

use crate::domain::{ListeningSocket, PortBinding};
use crate::error::Result;
use crate::ports::PortInspectorPort;

/// The main port inspector that uses platform-specific implementations.
pub struct PortInspector {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinScanner,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxScanner,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsScanner,
}

impl PortInspector {
    /// Create a new port inspector for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinScanner::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxScanner::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsScanner::new(),
        }
    }

    /// Scan all listening TCP sockets.
    pub async fn scan(&self) -> Result<Vec<ListeningSocket>> {
        self.inner.scan().await
    }
}

impl Default for PortInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl PortInspectorPort for PortInspector {
    async fn inspect(&self, port: u16) -> Result<PortBinding> {
        let sockets = self.inner.scan().await?;
        Ok(PortBinding::from_sockets(port, &sockets))
    }
}

/// Internal trait for platform-specific implementations.
trait Scanner: Send + Sync {
    fn scan(&self) -> impl Future<Output = Result<Vec<ListeningSocket>>> + Send;
}
