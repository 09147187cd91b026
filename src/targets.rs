// ABOUTME: Update targets: configured subtrees and their expansion into concrete targets.
// ABOUTME: Recursive targets expand to one target per child directory of the parent.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::remote::shell;

/// A target as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub id: String,
    /// Relative to the app root for updates, absolute for sync.
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Expand into one target per child directory of `path`.
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Command that applies migrations, run on the first host only.
    #[serde(default)]
    pub migrate_task: Option<String>,
    #[serde(default)]
    pub open_url: Option<String>,
}

impl TargetSpec {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            branch: None,
            owner: None,
            recursive: false,
            description: None,
            migrate_task: None,
            open_url: None,
        }
    }
}

/// A concrete subtree to update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    /// `id` for static targets, `parent/child` for expanded ones.
    pub id: String,
    pub path: String,
    pub branch: String,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub migrate_task: Option<String>,
    pub open_url: Option<String>,
    /// Id of the recursive target this one was expanded from.
    pub parent: Option<String>,
    /// Revision captured before pulling updates.
    pub old_head: Option<String>,
}

impl UpdateTarget {
    /// Display label, e.g. `modules/billing [modules/billing]`.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.id, self.path)
    }
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("no directory listing for recursive target: {0}")]
    MissingListing(String),

    #[error("target {0} has no branch and no global branch is configured")]
    MissingBranch(String),

    #[error("unknown target: {0}")]
    Unknown(String),

    #[error("You must choose at least one target to continue")]
    NothingSelected,
}

/// Configured targets that need a directory listing before expansion.
pub fn recursive_parents(configured: &[TargetSpec]) -> impl Iterator<Item = &TargetSpec> {
    configured.iter().filter(|t| t.recursive)
}

/// Expand configured targets into concrete ones.
///
/// `listings` maps each recursive target id to the child directory names found
/// under its path. Static targets pass through unchanged.
pub fn expand_targets(
    configured: &[TargetSpec],
    listings: &HashMap<String, Vec<String>>,
) -> Result<Vec<UpdateTarget>, TargetError> {
    let mut targets = Vec::new();
    for spec in configured {
        let branch = spec
            .branch
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| TargetError::MissingBranch(spec.id.clone()))?;

        if !spec.recursive {
            targets.push(concrete(spec, spec.id.clone(), spec.path.clone(), branch, None));
            continue;
        }

        let children = listings
            .get(&spec.id)
            .ok_or_else(|| TargetError::MissingListing(spec.id.clone()))?;
        for child in children {
            targets.push(concrete(
                spec,
                format!("{}/{}", spec.id, child),
                shell::join(&spec.path, child),
                branch.clone(),
                Some(spec.id.clone()),
            ));
        }
    }
    Ok(targets)
}

fn concrete(
    spec: &TargetSpec,
    id: String,
    path: String,
    branch: String,
    parent: Option<String>,
) -> UpdateTarget {
    UpdateTarget {
        id,
        path,
        branch,
        owner: spec.owner.clone(),
        description: spec.description.clone(),
        migrate_task: spec.migrate_task.clone(),
        open_url: spec.open_url.clone(),
        parent,
        old_head: None,
    }
}

/// Split `-t "a b" -t c` style arguments into names.
pub fn parse_selection(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Keep the targets named in `requested`, in configured order.
///
/// A name matches a target id, or a recursive parent id, which selects all
/// of its children.
pub fn select_targets(
    all: Vec<UpdateTarget>,
    requested: &[String],
) -> Result<Vec<UpdateTarget>, TargetError> {
    for name in requested {
        let known = all
            .iter()
            .any(|t| &t.id == name || t.parent.as_ref() == Some(name));
        if !known {
            return Err(TargetError::Unknown(name.clone()));
        }
    }

    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let selected = all
        .into_iter()
        .filter(|t| {
            wanted.contains(t.id.as_str())
                || t.parent.as_deref().is_some_and(|p| wanted.contains(p))
        })
        .collect();
    ensure_selected(selected)
}

pub fn ensure_selected(selected: Vec<UpdateTarget>) -> Result<Vec<UpdateTarget>, TargetError> {
    if selected.is_empty() {
        Err(TargetError::NothingSelected)
    } else {
        Ok(selected)
    }
}
