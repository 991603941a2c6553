//! Check command - probe the managed executable.

use anyhow::Result;
use portkeeper_core::{ConfigStore, DefaultSupervisor};

use super::{load_config, Overrides, Reply};

pub async fn run(store: &ConfigStore, overrides: &Overrides, json: bool) -> Result<bool> {
    let config = load_config(store, overrides).await?;
    let report = DefaultSupervisor::with_defaults(config).check_installation().await;

    let ok = report.is_ok();
    Reply::installation(report).print(json)?;
    Ok(ok)
}
