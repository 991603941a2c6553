//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no OS dependencies and can be tested in isolation.

mod handle;
mod port;
mod script;
mod status;

// Re-export all domain types
pub use handle::{ExitReport, ExitSender, ManagedProcessHandle};
pub use port::{ListeningSocket, PortBinding};
pub use script::{is_startup_confirmation, StartupScript, STARTUP_CONFIRMATION_MARKER};
pub use status::{InstallationReport, ServiceStatus, SupervisorState};
