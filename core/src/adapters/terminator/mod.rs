//! Process terminator adapters.
//!
//! Forced termination only:
//! - Unix: `SIGKILL` via `kill(2)`
//! - Windows: `taskkill /F /PID <pid>`

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

// Platform-specific exports
#[cfg(unix)]
pub use unix::UnixTerminator as ProcessTerminator;

#[cfg(windows)]
pub use windows::WindowsTerminator as ProcessTerminator;
