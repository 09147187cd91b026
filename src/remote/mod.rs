// ABOUTME: Remote executor capability: fan a shell command out to every server.
// ABOUTME: Transitions depend only on this trait; SSH and test fakes implement it.

mod fleet;
mod ops;
pub mod shell;

pub use fleet::SshFleet;
pub use ops::RemoteOps;

use async_trait::async_trait;
use thiserror::Error;

/// A shell command plus the options that shape how it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    script: String,
    cwd: Option<String>,
    mute: bool,
}

impl RemoteCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            cwd: None,
            mute: false,
        }
    }

    /// Run inside `dir` (`cd <dir> && ...`).
    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Suppress echoing of this command's output.
    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// The exact line handed to the remote shell.
    pub fn render(&self) -> String {
        match &self.cwd {
            Some(dir) => format!("cd {} && {}", shell::quote(dir), self.script),
            None => self.script.clone(),
        }
    }
}

/// Outcome of one command on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutput {
    pub host: String,
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout without surrounding whitespace; most lookups print one line.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{host}: transport failure: {message}")]
    Transport { host: String, message: String },

    #[error("{host}: `{command}` exited with status {exit_code}{}", stderr_suffix(.stderr))]
    CommandFailed {
        host: String,
        command: String,
        exit_code: u32,
        stderr: String,
    },

    #[error("no host with index {0}")]
    NoSuchHost(usize),
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Runs shell commands on the configured servers.
///
/// `execute` fans out concurrently and returns one output per host, in host
/// order. A non-zero exit status is not an error at this level; only a broken
/// transport is.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Host labels in fan-out order.
    fn hosts(&self) -> &[String];

    async fn execute(&self, command: &RemoteCommand) -> Result<Vec<HostOutput>, RemoteError>;

    async fn execute_on(&self, host: usize, command: &RemoteCommand)
    -> Result<HostOutput, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefixes_working_directory() {
        let cmd = RemoteCommand::new("git rev-parse HEAD").in_dir("/srv/releases/current-update/api");
        assert_eq!(
            cmd.render(),
            "cd /srv/releases/current-update/api && git rev-parse HEAD"
        );
    }

    #[test]
    fn render_quotes_unusual_directories() {
        let cmd = RemoteCommand::new("ls").in_dir("/srv/my app");
        assert_eq!(cmd.render(), "cd '/srv/my app' && ls");
    }

    #[test]
    fn muted_flag_is_kept() {
        let cmd = RemoteCommand::new("test -d /x").muted();
        assert!(cmd.is_muted());
        assert_eq!(cmd.cwd(), None);
    }

    #[test]
    fn command_failure_mentions_stderr() {
        let err = RemoteError::CommandFailed {
            host: "web1".into(),
            command: "readlink /srv/app".into(),
            exit_code: 1,
            stderr: "no such file\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "web1: `readlink /srv/app` exited with status 1: no such file"
        );
    }
}
