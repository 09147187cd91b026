// ABOUTME: Errors raised while talking to one release host over SSH.
// ABOUTME: Separates reaching the host, proving identity, and running a remote command.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("can't reach {addr}: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("none of the offered keys was accepted")]
    KeysRejected,

    #[error("no SSH identity to offer: {0}")]
    NoIdentity(String),

    #[error("can't read SSH key {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },

    #[error("can't start a remote command: {0}")]
    Exec(String),

    #[error("remote command still running after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("remote command ended without an exit status")]
    NoExitStatus,

    #[error(transparent)]
    Transport(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_names_the_address() {
        let err = Error::Unreachable {
            addr: "app1:22".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "can't reach app1:22: connection refused");
    }

    #[test]
    fn timeout_is_reported_in_seconds() {
        let err = Error::Timeout(Duration::from_secs(600));
        assert_eq!(err.to_string(), "remote command still running after 600s");
    }
}
