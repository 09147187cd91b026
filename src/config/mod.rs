// ABOUTME: Configuration types and parsing for relink.yml.
// ABOUTME: Handles YAML parsing, discovery, target defaults, and destination merging.

mod deserialize;
mod init;
mod server;

pub use init::init_config;
pub use server::ServerConfig;

use crate::error::{Error, Result};
use crate::remote::shell;
use crate::targets::TargetSpec;
use deserialize::{
    deserialize_keep_releases, deserialize_remote_path, deserialize_remote_path_option,
    deserialize_servers, deserialize_servers_option, remote_path,
};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "relink.yml";
pub const CONFIG_FILENAME_ALT: &str = "relink.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".relink/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    /// Root of the live application tree.
    #[serde(deserialize_with = "deserialize_remote_path")]
    pub app_path: String,

    #[serde(default)]
    pub branch: Option<String>,

    /// Owner applied by the permission reset before any change.
    #[serde(default)]
    pub owner: Option<String>,

    /// Replaces the default `chown`/`chmod` permission reset.
    #[serde(default)]
    pub reset_dir_script: Option<String>,

    #[serde(default)]
    pub restart_script: Option<String>,

    #[serde(default)]
    pub show_status_script: Option<String>,

    #[serde(default)]
    pub open_url: Option<String>,

    #[serde(default = "default_install_command")]
    pub install_command: String,

    #[serde(default = "default_status_delay", with = "humantime_serde")]
    pub status_delay: Duration,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,

    /// Remote application log shown by `relink log`.
    #[serde(default)]
    pub log_path: Option<String>,

    #[serde(default)]
    pub update: Option<UpdateConfig>,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

/// Release storage used by `update`, `rollback`, `status` and `prune`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    #[serde(deserialize_with = "deserialize_remote_path")]
    pub releases: String,

    /// The `current` symlink.
    #[serde(deserialize_with = "deserialize_remote_path")]
    pub current: String,

    #[serde(
        default = "default_keep_releases",
        deserialize_with = "deserialize_keep_releases"
    )]
    pub keep_releases: usize,

    #[serde(default = "default_release_label")]
    pub release_label: String,

    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Live-tree targets with absolute paths. Empty means `app_path` itself.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Destination {
    #[serde(default, deserialize_with = "deserialize_servers_option")]
    pub servers: Option<NonEmpty<ServerConfig>>,

    #[serde(default, deserialize_with = "deserialize_remote_path_option")]
    pub app_path: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub open_url: Option<String>,
}

fn default_install_command() -> String {
    "npm install".to_string()
}

fn default_status_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_keep_releases() -> usize {
    5
}

fn default_release_label() -> String {
    "release".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if let Some(update) = &self.update {
            if update.release_label.is_empty()
                || !update
                    .release_label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(Error::InvalidConfig(format!(
                    "release_label must be word characters only: {:?}",
                    update.release_label
                )));
            }
            check_unique_ids("update", &update.targets)?;
        }
        check_unique_ids("sync", &self.sync.targets)?;
        for target in &self.sync.targets {
            remote_path(&target.path).map_err(|reason| {
                Error::InvalidConfig(format!("sync target {}: {reason}", target.id))
            })?;
        }
        Ok(())
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref servers) = dest.servers {
            merged.servers = servers.clone();
        }
        if let Some(ref app_path) = dest.app_path {
            merged.app_path = app_path.clone();
        }
        if dest.branch.is_some() {
            merged.branch = dest.branch.clone();
        }
        if dest.owner.is_some() {
            merged.owner = dest.owner.clone();
        }
        if dest.open_url.is_some() {
            merged.open_url = dest.open_url.clone();
        }

        Ok(merged)
    }

    /// Release storage settings, required by the release-based commands.
    pub fn releases(&self) -> Result<&UpdateConfig> {
        self.update.as_ref().ok_or_else(|| {
            Error::InvalidConfig("an `update:` section is required for this command".to_string())
        })
    }

    /// Update targets with global defaults applied.
    pub fn update_targets(&self) -> Result<Vec<TargetSpec>> {
        Ok(self
            .releases()?
            .targets
            .iter()
            .map(|t| self.with_defaults(t))
            .collect())
    }

    /// Sync targets with global defaults applied. Without configured targets,
    /// the whole application tree is the single target.
    pub fn sync_targets(&self) -> Vec<TargetSpec> {
        if self.sync.targets.is_empty() {
            let id = shell::basename(&self.app_path).to_string();
            return vec![self.with_defaults(&TargetSpec::new(id, self.app_path.clone()))];
        }
        self.sync
            .targets
            .iter()
            .map(|t| self.with_defaults(t))
            .collect()
    }

    fn with_defaults(&self, target: &TargetSpec) -> TargetSpec {
        let mut target = target.clone();
        target.branch = target.branch.or_else(|| self.branch.clone());
        target.owner = target.owner.or_else(|| self.owner.clone());
        target.open_url = target.open_url.or_else(|| self.open_url.clone());
        target
    }

    pub fn template() -> Self {
        Config {
            servers: NonEmpty::new(ServerConfig {
                host: "app1.example.com".to_string(),
                port: 22,
                user: Some("deploy".to_string()),
                key_path: None,
                trust_first_connection: false,
            }),
            app_path: "/srv/app".to_string(),
            branch: Some("master".to_string()),
            owner: None,
            reset_dir_script: None,
            restart_script: Some("sudo systemctl restart app".to_string()),
            show_status_script: Some("systemctl status app --no-pager".to_string()),
            open_url: None,
            install_command: default_install_command(),
            status_delay: default_status_delay(),
            command_timeout: None,
            log_path: None,
            update: Some(UpdateConfig {
                releases: "/srv/releases".to_string(),
                current: "/srv/app".to_string(),
                keep_releases: default_keep_releases(),
                release_label: default_release_label(),
                targets: vec![TargetSpec::new("app", ".")],
            }),
            sync: SyncConfig::default(),
            destinations: HashMap::new(),
        }
    }
}

fn check_unique_ids(section: &str, targets: &[TargetSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.id.is_empty() || target.id.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "{section} target id must be non-empty and contain no '/': {:?}",
                target.id
            )));
        }
        if !seen.insert(target.id.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "duplicate {section} target id: {}",
                target.id
            )));
        }
    }
    Ok(())
}
