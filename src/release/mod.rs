// ABOUTME: Release snapshots on the remote release storage: naming, parsing, ordering.
// ABOUTME: Provides previous-release lookup and retention pruning over a sorted set.

mod listing;

pub use listing::{DirListing, reconcile_listings};

use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

use crate::remote::shell;

/// Staging directory name inside the releases root.
pub const STAGING_DIR: &str = "current-update";

/// Symlink inside the releases root pointing at the previous current release.
pub const LAST_WORKED_LINK: &str = "last-worked";

/// `<label>-<DD.MM.YYYY>-<epochMillis>`; the trailing group is the sort key.
static RELEASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+-[\d.]+-(\d+)$").unwrap());

/// Paths of the release storage on every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLayout {
    pub root: String,
    /// The `current` symlink.
    pub current: String,
    pub staging: String,
    pub last_worked: String,
}

impl ReleaseLayout {
    pub fn new(root: &str, current: &str) -> Self {
        Self {
            root: shell::trim_trailing_slash(root).to_string(),
            current: shell::trim_trailing_slash(current).to_string(),
            staging: shell::join(root, STAGING_DIR),
            last_worked: shell::join(root, LAST_WORKED_LINK),
        }
    }

    pub fn release_path(&self, name: &str) -> String {
        shell::join(&self.root, name)
    }
}

/// One release directory under the releases root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    pub name: String,
    pub path: String,
    pub created_at_epoch_millis: u64,
}

impl ReleaseSnapshot {
    /// Parse a directory name; `None` if it is not a release name.
    pub fn parse(root: &str, name: &str) -> Option<Self> {
        let captures = RELEASE_NAME.captures(name)?;
        let created_at_epoch_millis = captures[1].parse().ok()?;
        Some(Self {
            name: name.to_string(),
            path: shell::join(root, name),
            created_at_epoch_millis,
        })
    }

    /// Name for a snapshot created at `at`, e.g. `release-05.03.2024-1709647200000`.
    pub fn name_for<Tz: TimeZone>(label: &str, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{label}-{}-{}",
            at.format("%d.%m.%Y"),
            at.timestamp_millis()
        )
    }
}

/// Outcome of looking up the release before the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousRelease {
    Found(ReleaseSnapshot),
    /// The current release is the first one; there is nothing older.
    OldestRelease,
    /// The current release is not in the listing at all.
    NotFound,
}

/// Release snapshots in ascending creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    releases: Vec<ReleaseSnapshot>,
}

impl ReleaseSet {
    /// Keep the names that parse as releases and sort them by creation time.
    pub fn from_names<S: AsRef<str>>(root: &str, names: &[S]) -> Self {
        let mut releases: Vec<_> = names
            .iter()
            .filter_map(|name| ReleaseSnapshot::parse(root, name.as_ref()))
            .collect();
        releases.sort_by(|a, b| {
            a.created_at_epoch_millis
                .cmp(&b.created_at_epoch_millis)
                .then_with(|| a.name.cmp(&b.name))
        });
        releases.dedup_by(|a, b| a.name == b.name);
        Self { releases }
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReleaseSnapshot> {
        self.releases.iter()
    }

    pub fn newest(&self) -> Option<&ReleaseSnapshot> {
        self.releases.last()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.releases.iter().any(|r| r.name == name)
    }

    /// The snapshot immediately before `current_name`.
    pub fn find_previous(&self, current_name: &str) -> PreviousRelease {
        match self.releases.iter().position(|r| r.name == current_name) {
            None => PreviousRelease::NotFound,
            Some(0) => PreviousRelease::OldestRelease,
            Some(i) => PreviousRelease::Found(self.releases[i - 1].clone()),
        }
    }

    /// Snapshots outside the `keep` most recent, newest first.
    pub fn prune(&self, keep: usize) -> Vec<ReleaseSnapshot> {
        if self.releases.len() <= keep {
            return Vec::new();
        }
        let mut by_recency: Vec<_> = self.releases.iter().collect();
        by_recency.sort_by(|a, b| {
            b.created_at_epoch_millis
                .cmp(&a.created_at_epoch_millis)
                .then_with(|| b.name.cmp(&a.name))
        });
        by_recency.into_iter().skip(keep).cloned().collect()
    }
}
