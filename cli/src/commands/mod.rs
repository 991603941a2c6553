//! CLI commands and the reply format they share.

pub mod check;
pub mod config;
pub mod serve;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;
use portkeeper_core::{ConfigStore, InstallationReport, ServiceStatus, SupervisorConfig};
use serde::Serialize;

/// Values given on the command line that win over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub executable: Option<String>,
}

/// Open the config store at `path`, or at the default location.
pub fn config_store(path: Option<PathBuf>) -> Result<ConfigStore> {
    Ok(match path {
        Some(path) => ConfigStore::with_path(path),
        None => ConfigStore::new()?,
    })
}

/// Load the config file and apply the command line overrides.
pub async fn load_config(store: &ConfigStore, overrides: &Overrides) -> Result<SupervisorConfig> {
    let mut config = store.load().await?;
    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(executable) = &overrides.executable {
        config.executable = executable.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Answer to one front-end command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub command: String,
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation: Option<InstallationReport>,
}

impl Reply {
    pub fn ok(command: &str, message: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            ok: true,
            message: message.into(),
            status: None,
            port: None,
            pid: None,
            address: None,
            installation: None,
        }
    }

    pub fn error(command: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            ..Self::ok(command, message)
        }
    }

    pub fn status(port: u16, status: ServiceStatus, pid: Option<u32>) -> Self {
        let message = match pid {
            Some(pid) => format!("{} on port {} (PID: {})", status, port, pid),
            None => format!("{} on port {}", status, port),
        };
        Self {
            status: Some(status),
            port: Some(port),
            pid,
            ..Self::ok("status", message)
        }
    }

    pub fn installation(report: InstallationReport) -> Self {
        let message = report.to_string();
        Self {
            ok: report.is_ok(),
            installation: Some(report),
            ..Self::ok("check", message)
        }
    }

    /// Print to stdout, as one JSON line or as plain text.
    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string(self)?);
        } else if self.ok {
            println!("{}", self.message);
        } else {
            println!("ERROR: {}", self.message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reply_json_skips_empty_fields() {
        let reply = Reply::status(5555, ServiceStatus::Running, Some(42));
        let json = serde_json::to_value(&reply).unwrap();

        assert_eq!(json["command"], "status");
        assert_eq!(json["status"], "running");
        assert_eq!(json["pid"], 42);
        assert_eq!(json["message"], "running on port 5555 (PID: 42)");
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_installation_reply_carries_result() {
        let reply = Reply::installation(InstallationReport::Error {
            executable: "q".to_string(),
            reason: "not found in PATH".to_string(),
            output: String::new(),
        });
        assert!(!reply.ok);

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["installation"]["result"], "error");
        assert_eq!(json["message"], "ERROR: 'q' not found in PATH");
    }

    #[tokio::test]
    async fn test_overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let store = config_store(Some(dir.path().join("config.json"))).unwrap();

        let overrides = Overrides {
            port: Some(6000),
            executable: None,
        };
        let config = load_config(&store, &overrides).await.unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.executable, "q");

        let overrides = Overrides {
            port: Some(0),
            executable: None,
        };
        assert!(load_config(&store, &overrides).await.is_err());
    }
}
