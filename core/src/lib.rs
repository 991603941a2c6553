//! PortKeeper Core Library
//!
//! Keeps exactly one instance of a long-running server bound to a fixed TCP
//! port. Provides functionality to:
//! - Find out whether a port is listening and which process owns it
//! - Forcibly terminate a process by PID
//! - Generate the startup script of the managed kdb+ server
//! - Launch the managed server and confirm it survives a short window
//! - Start, stop, restart and force start it through a single supervisor
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models (handle, port binding, script, status)
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: OS implementations of the ports
//! - `application`: The supervisor
//!
//! # Platform Support
//! - macOS: Uses `lsof`
//! - Linux: Uses `ss`, falling back to `netstat`
//! - Windows: Uses `netstat` and `taskkill`

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use application::{DefaultSupervisor, Supervisor};
pub use config::{ConfigStore, SupervisorConfig};
pub use domain::{InstallationReport, ManagedProcessHandle, PortBinding, ServiceStatus, SupervisorState};
pub use error::{Error, Phase, Result};
