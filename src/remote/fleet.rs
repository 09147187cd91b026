// ABOUTME: SSH-backed remote executor holding one session per configured server.
// ABOUTME: Fans commands out concurrently and echoes unmuted output per host.

use super::{HostOutput, RemoteCommand, RemoteError, RemoteExecutor};
use crate::config::ServerConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::ssh::Session;
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use std::io::Write;
use std::time::Duration;

/// Open SSH sessions to every server, in config order.
pub struct SshFleet {
    hosts: Vec<String>,
    sessions: Vec<Session>,
    echo: bool,
}

impl SshFleet {
    /// Connect to all servers concurrently. Fails if any server is unreachable.
    pub async fn connect<'a>(
        servers: impl IntoIterator<Item = &'a ServerConfig>,
        command_timeout: Option<Duration>,
        echo: bool,
    ) -> Result<Self> {
        let servers: Vec<&ServerConfig> = servers.into_iter().collect();
        let sessions = try_join_all(servers.iter().map(|server| async move {
            Session::connect(server.ssh_session_config(command_timeout))
                .await
                .map_err(|source| Error::Ssh {
                    host: server.label(),
                    source,
                })
        }))
        .await?;

        Ok(Self {
            hosts: servers.iter().map(|s| s.label()).collect(),
            sessions,
            echo,
        })
    }

    /// Close every session. Failures are recorded, not returned.
    pub async fn disconnect(self, diag: &mut Diagnostics) {
        let results = join_all(self.sessions.into_iter().map(|session| async move {
            let host = session.host().to_string();
            session.disconnect().await.map_err(|e| (host, e))
        }))
        .await;

        for (host, e) in results.into_iter().filter_map(|r| r.err()) {
            diag.warn(Warning::ssh_disconnect(format!(
                "SSH disconnect failed for {host}: {e}"
            )));
        }
    }

    async fn run(&self, index: usize, command: &RemoteCommand) -> std::result::Result<HostOutput, RemoteError> {
        let session = self
            .sessions
            .get(index)
            .ok_or(RemoteError::NoSuchHost(index))?;
        let host = &self.hosts[index];

        let result = session
            .exec(&command.render())
            .await
            .map_err(|e| RemoteError::Transport {
                host: host.clone(),
                message: e.to_string(),
            })?;

        let output = HostOutput {
            host: host.clone(),
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        };
        if self.echo && !command.is_muted() {
            echo(&output);
        }
        Ok(output)
    }
}

fn echo(output: &HostOutput) {
    echo_to(&mut std::io::stdout().lock(), output);
}

/// Prefix every output line with the host. Stops at the first write error.
fn echo_to(out: &mut impl Write, output: &HostOutput) {
    for line in output.stdout.lines().chain(output.stderr.lines()) {
        if let Err(e) = writeln!(out, "[{}] {}", output.host, line) {
            tracing::trace!(host = %output.host, "can't echo remote output: {e}");
            return;
        }
    }
}

#[async_trait]
impl RemoteExecutor for SshFleet {
    fn hosts(&self) -> &[String] {
        &self.hosts
    }

    async fn execute(&self, command: &RemoteCommand) -> std::result::Result<Vec<HostOutput>, RemoteError> {
        tracing::debug!(command = %command.render(), hosts = self.hosts.len(), "fan-out");
        join_all((0..self.sessions.len()).map(|i| self.run(i, command)))
            .await
            .into_iter()
            .collect()
    }

    async fn execute_on(
        &self,
        host: usize,
        command: &RemoteCommand,
    ) -> std::result::Result<HostOutput, RemoteError> {
        self.run(host, command).await
    }
}
