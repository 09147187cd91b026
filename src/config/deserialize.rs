// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles server lists, pointer paths, and the retention count.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    into_servers(values)?
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

pub fn deserialize_servers_option<'de, D>(
    deserializer: D,
) -> Result<Option<NonEmpty<ServerConfig>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Vec<ServerEntry>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(values) => into_servers(values)?
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("destination servers list cannot be empty")),
    }
}

fn into_servers<E: serde::de::Error>(
    values: Vec<ServerEntry>,
) -> Result<Option<NonEmpty<ServerConfig>>, E> {
    let servers = values
        .into_iter()
        .map(ServerEntry::into_server_config)
        .collect::<Result<Vec<_>, _>>()
        .map_err(E::custom)?;
    Ok(NonEmpty::from_vec(servers))
}

/// Remote paths are compared verbatim with `readlink` output, so a trailing
/// slash is dropped.
pub fn deserialize_remote_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    remote_path(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_remote_path_option<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| remote_path(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

pub(super) fn remote_path(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("remote path cannot be empty".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err(format!("remote path must be absolute: {trimmed}"));
    }
    Ok(crate::remote::shell::trim_trailing_slash(trimmed).to_string())
}

pub fn deserialize_keep_releases<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let keep = usize::deserialize(deserializer)?;
    if keep == 0 {
        return Err(serde::de::Error::custom(
            "keep_releases must be at least 1 (the current release is always kept)",
        ));
    }
    Ok(keep)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}
