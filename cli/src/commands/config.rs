//! Config command - show and edit the configuration file.

use anyhow::Result;
use portkeeper_core::ConfigStore;

use super::{load_config, Overrides, Reply};

/// Show the effective configuration, overrides applied.
pub async fn show(store: &ConfigStore, overrides: &Overrides, json: bool) -> Result<bool> {
    let config = load_config(store, overrides).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(true);
    }

    println!("Config file: {}", store.config_path().display());
    println!();
    println!("Port:              {}", config.port);
    println!("Executable:        {}", config.executable);
    println!(
        "Startup script:    {}",
        config.script_dir().join(&config.script_file_name).display()
    );
    println!("Launch window:     {:?}", config.launch_window());
    println!("Eviction settle:   {:?}", config.eviction_settle());
    println!("Stop settle:       {:?}", config.stop_settle());
    println!("Restart settle:    {:?}", config.restart_settle());
    println!("Install probe:     {}", config.install_probe_args.join(" "));
    Ok(true)
}

/// Set one key in the config file.
pub async fn set(store: &ConfigStore, key: &str, value: &str, json: bool) -> Result<bool> {
    let mut config = store.load().await?;
    config.set(key, value)?;
    store.save(&config).await?;

    Reply::ok("config", format!("Set {} = {}", key, value)).print(json)?;
    Ok(true)
}

pub fn path(store: &ConfigStore, json: bool) -> Result<bool> {
    Reply::ok("config", store.config_path().display().to_string()).print(json)?;
    Ok(true)
}
