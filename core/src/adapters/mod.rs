//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with the operating system.

pub mod inspector;
pub mod launcher;
pub mod terminator;

// Re-export main types for convenience
pub use inspector::PortInspector;
pub use launcher::ProcessLauncher;
pub use terminator::ProcessTerminator;
