//! Application layer - Use case services.
//!
//! The supervisor orchestrates the domain types and the OS ports. It has no
//! OS knowledge of its own, so any set of port implementations can drive it.

mod supervisor;

pub use supervisor::{DefaultSupervisor, Supervisor};
