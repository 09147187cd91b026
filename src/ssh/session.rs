// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, authentication, and one-shot command execution.

use super::error::{Error, Result};
use super::handler::HostKeyPolicy;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// If None, the SSH agent is tried first, then default key locations.
    pub key_path: Option<PathBuf>,
    /// Accept and record unknown host keys instead of refusing them.
    pub trust_on_first_use: bool,
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Upper bound for a single command. None waits indefinitely.
    pub command_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Raw result of one remote command.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

enum Credentials {
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// An established SSH session to one server.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyPolicy>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = resolve_credentials(&config).await?;

        let russh_config = Config {
            keepalive_interval: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        let policy = HostKeyPolicy {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        };

        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            policy,
        )
        .await
        .map_err(|e| Error::Unreachable {
            addr: format!("{}:{}", config.host, config.port),
            reason: e.to_string(),
        })?;

        if !authenticate(&mut handle, &config.user, credentials).await? {
            return Err(Error::KeysRejected);
        }

        Ok(Self { config, handle })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Run a command to completion, honouring the configured timeout.
    pub async fn exec(&self, command: &str) -> Result<ExecResult> {
        match self.config.command_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(command))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.run(command).await,
        }
    }

    async fn run(&self, command: &str) -> Result<ExecResult> {
        tracing::debug!(host = %self.config.host, %command, "exec");
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Exec(e.to_string()))?;
        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        let mut eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                    if eof {
                        break;
                    }
                }
                ChannelMsg::Eof => {
                    eof = true;
                    if exit_code.is_some() {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let exit_code = exit_code.ok_or(Error::NoExitStatus)?;
        Ok(ExecResult {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

async fn resolve_credentials(config: &SessionConfig) -> Result<Credentials> {
    if let Some(key_path) = &config.key_path {
        let key = load_secret_key(key_path, None).map_err(|e| Error::KeyFile {
            path: key_path.clone(),
            reason: e.to_string(),
        })?;
        return Ok(Credentials::KeyFile(Arc::new(key)));
    }

    if let Ok(agent) = AgentClient::connect_env().await {
        return Ok(Credentials::Agent(agent));
    }

    let home = std::env::var("HOME").map_err(|_| {
        Error::NoIdentity("no SSH agent and HOME is not set".to_string())
    })?;

    ["id_ed25519", "id_rsa", "id_ecdsa"]
        .iter()
        .find_map(|name| load_secret_key(format!("{home}/.ssh/{name}"), None).ok())
        .map(|key| Credentials::KeyFile(Arc::new(key)))
        .ok_or_else(|| {
            Error::NoIdentity("no SSH agent and no key in ~/.ssh".to_string())
        })
}

async fn authenticate(
    handle: &mut Handle<HostKeyPolicy>,
    user: &str,
    credentials: Credentials,
) -> Result<bool> {
    match credentials {
        Credentials::Agent(mut agent) => {
            let identities = agent.request_identities().await.map_err(|e| {
                Error::NoIdentity(format!("can't list agent keys: {e}"))
            })?;
            if identities.is_empty() {
                return Err(Error::NoIdentity("the SSH agent holds no keys".to_string()));
            }
            for identity in identities {
                if let Ok(result) = handle
                    .authenticate_publickey_with(user, identity, None, &mut agent)
                    .await
                    && result.success()
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Credentials::KeyFile(key) => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            let result = handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?;
            Ok(result.success())
        }
    }
}
