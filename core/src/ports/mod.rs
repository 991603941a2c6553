//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces the supervisor uses to interact
//! with the operating system. Implementations live in `adapters`.

mod inspector;
mod launcher;
mod terminator;

pub use inspector::PortInspectorPort;
pub use launcher::{LaunchRequest, ProcessLauncherPort};
pub use terminator::ProcessTerminatorPort;
