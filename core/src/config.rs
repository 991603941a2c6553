//! Supervisor configuration.
//!
//! Stored as JSON at `~/.portkeeper/config.json`. Every field has a default,
//! so a missing file or a partial file both load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Settings for one supervised server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// TCP port the managed server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Executable name, resolved on the search path.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// File name the startup script is written to.
    #[serde(default = "default_script_file_name")]
    pub script_file_name: String,

    /// Directory for the startup script. OS temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_dir: Option<PathBuf>,

    /// How long a fresh launch must survive to count as started.
    #[serde(default = "default_launch_window_ms")]
    pub launch_window_ms: u64,

    /// Wait after killing a port occupant.
    #[serde(default = "default_eviction_settle_ms")]
    pub eviction_settle_ms: u64,

    /// Wait after stopping our own instance during a force start.
    #[serde(default = "default_stop_settle_ms")]
    pub stop_settle_ms: u64,

    /// Wait between stop and launch on restart.
    #[serde(default = "default_restart_settle_ms")]
    pub restart_settle_ms: u64,

    /// Arguments for the installation probe.
    #[serde(default = "default_install_probe_args")]
    pub install_probe_args: Vec<String>,
}

fn default_port() -> u16 {
    5555
}

fn default_executable() -> String {
    "q".to_string()
}

fn default_script_file_name() -> String {
    "kdb_ws_init.q".to_string()
}

fn default_launch_window_ms() -> u64 {
    2000
}

fn default_eviction_settle_ms() -> u64 {
    2000
}

fn default_stop_settle_ms() -> u64 {
    1000
}

fn default_restart_settle_ms() -> u64 {
    2000
}

fn default_install_probe_args() -> Vec<String> {
    ["-q", "-c", "2+2"].iter().map(|s| s.to_string()).collect()
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            executable: default_executable(),
            script_file_name: default_script_file_name(),
            script_dir: None,
            launch_window_ms: default_launch_window_ms(),
            eviction_settle_ms: default_eviction_settle_ms(),
            stop_settle_ms: default_stop_settle_ms(),
            restart_settle_ms: default_restart_settle_ms(),
            install_probe_args: default_install_probe_args(),
        }
    }
}

impl SupervisorConfig {
    /// Reject settings the supervisor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }
        if self.executable.trim().is_empty() {
            return Err(Error::Config("executable must not be empty".to_string()));
        }
        if self.script_file_name.trim().is_empty() {
            return Err(Error::Config("scriptFileName must not be empty".to_string()));
        }
        if Path::new(&self.script_file_name).file_name()
            != Some(std::ffi::OsStr::new(&self.script_file_name))
        {
            return Err(Error::Config(format!(
                "scriptFileName must be a plain file name, got '{}'",
                self.script_file_name
            )));
        }
        Ok(())
    }

    /// Directory the startup script is written to.
    pub fn script_dir(&self) -> PathBuf {
        self.script_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn launch_window(&self) -> Duration {
        Duration::from_millis(self.launch_window_ms)
    }

    pub fn eviction_settle(&self) -> Duration {
        Duration::from_millis(self.eviction_settle_ms)
    }

    pub fn stop_settle(&self) -> Duration {
        Duration::from_millis(self.stop_settle_ms)
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    /// Set one field from its JSON key and a textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        let invalid = |e: &dyn std::fmt::Display| {
            Error::Config(format!("invalid value '{}' for {}: {}", value, key, e))
        };

        match key {
            "port" => next.port = value.parse().map_err(|e| invalid(&e))?,
            "executable" => next.executable = value.to_string(),
            "scriptFileName" => next.script_file_name = value.to_string(),
            "scriptDir" => {
                next.script_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            "launchWindowMs" => next.launch_window_ms = value.parse().map_err(|e| invalid(&e))?,
            "evictionSettleMs" => {
                next.eviction_settle_ms = value.parse().map_err(|e| invalid(&e))?
            }
            "stopSettleMs" => next.stop_settle_ms = value.parse().map_err(|e| invalid(&e))?,
            "restartSettleMs" => {
                next.restart_settle_ms = value.parse().map_err(|e| invalid(&e))?
            }
            "installProbeArgs" => {
                next.install_probe_args = value.split_whitespace().map(str::to_string).collect()
            }
            other => return Err(Error::Config(format!("unknown config key '{}'", other))),
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Configuration store backed by a JSON file.
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a store at the default path, `~/.portkeeper/config.json`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".portkeeper").join("config.json"),
        })
    }

    /// Create a store at a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns the default config if the file doesn't exist.
    pub async fn load(&self) -> Result<SupervisorConfig> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SupervisorConfig::default())
            }
            Err(e) => return Err(Error::Config(format!("Failed to read config: {}", e))),
        };

        let config: SupervisorConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk, creating the directory if needed.
    pub async fn save(&self, config: &SupervisorConfig) -> Result<()> {
        config.validate()?;

        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)?;

        // Write to a temp file then rename so readers never see a partial file
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}
