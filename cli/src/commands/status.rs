//! Status command - port-only view of the supervised port.

use anyhow::Result;
use portkeeper_core::adapters::PortInspector;
use portkeeper_core::ports::PortInspectorPort;
use portkeeper_core::{ConfigStore, ServiceStatus};

use super::{load_config, Overrides, Reply};

/// Report whether anything listens on the configured port.
///
/// A one-shot process owns no handle, so this is the externally visible
/// state: running iff the port is listening.
pub async fn run(store: &ConfigStore, overrides: &Overrides, json: bool) -> Result<bool> {
    let config = load_config(store, overrides).await?;
    let binding = PortInspector::new().inspect(config.port).await?;

    let status = if binding.occupied {
        ServiceStatus::Running
    } else {
        ServiceStatus::Stopped
    };

    Reply::status(config.port, status, binding.owner_pid).print(json)?;
    Ok(true)
}
