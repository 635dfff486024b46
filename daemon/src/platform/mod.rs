//! Platform collaborators: running application listing and activation
//!
//! macOS uses NSWorkspace / NSRunningApplication. Other platforms get
//! inert implementations that report `Unsupported`, so the daemon still
//! starts and the IPC surface still works.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{WorkspaceActivator, WorkspaceSource};

#[cfg(not(target_os = "macos"))]
mod fallback;
#[cfg(not(target_os = "macos"))]
pub use fallback::{WorkspaceActivator, WorkspaceSource};
