// ABOUTME: SSH transport for running release commands on remote servers.
// ABOUTME: Supports SSH agent and key-based authentication with known_hosts verification.

mod error;
mod handler;
mod session;

pub use error::{Error, Result};
pub use session::{ExecResult, Session, SessionConfig};
