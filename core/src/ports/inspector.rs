//! Port inspector port (interface).

use std::future::Future;

use tracing::warn;

use crate::domain::PortBinding;
use crate::error::Result;

/// Port for querying which process listens on a TCP port.
///
/// Implementations scan the OS socket table on every call; results
/// are never cached.
pub trait PortInspectorPort: Send + Sync {
    /// Scan the socket table and derive the binding of `port`.
    fn inspect(&self, port: u16) -> impl Future<Output = Result<PortBinding>> + Send;

    /// Whether something listens on `port`.
    ///
    /// Never fails: if the scan itself fails the port is assumed free so
    /// a launch can still be attempted. This can double-launch when the
    /// scan tool is unavailable and is logged as a degraded inspection.
    fn is_listening(&self, port: u16) -> impl Future<Output = bool> + Send {
        async move {
            match self.inspect(port).await {
                Ok(binding) => binding.occupied,
                Err(e) => {
                    warn!(port, error = %e, "Port inspection degraded, assuming port is free");
                    false
                }
            }
        }
    }

    /// PID of the first process listening on `port`.
    ///
    /// `Ok(None)` is possible even right after `is_listening` returned
    /// true: the socket may have closed between the two scans, or the OS
    /// may not disclose the owner.
    fn find_owner(&self, port: u16) -> impl Future<Output = Result<Option<u32>>> + Send {
        async move { Ok(self.inspect(port).await?.owner_pid) }
    }
}
