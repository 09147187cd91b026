// ABOUTME: Retention pruning and pointer inspection of the releases root.
// ABOUTME: Pruning never fails a transition; problems become warnings.

use std::collections::HashSet;

use super::TransitionContext;
use crate::diagnostics::{Diagnostics, Warning};
use crate::release::{ReleaseLayout, ReleaseSet};
use crate::remote::{HostOutput, RemoteError, RemoteOps, shell};

/// Pointer state of one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPointers {
    pub host: String,
    pub current: Option<String>,
    pub last_worked: Option<String>,
    /// A staging directory from an interrupted update is present.
    pub staging_left: bool,
}

/// Read `current`, `last-worked`, and the staging marker on every host.
///
/// Dangling or missing links read as `None`.
pub async fn read_pointers(
    remote: RemoteOps<'_>,
    layout: &ReleaseLayout,
) -> Result<Vec<HostPointers>, RemoteError> {
    let current = remote.run_unchecked(&shell::readlink(&layout.current)).await?;
    let last_worked = remote.run_unchecked(&shell::readlink(&layout.last_worked)).await?;
    let staging = remote.dir_exists(&layout.staging).await?;

    let target = |output: &HostOutput| {
        (output.success() && !output.text().is_empty()).then(|| output.text().to_string())
    };
    Ok(current
        .iter()
        .zip(&last_worked)
        .zip(staging)
        .map(|((current, last_worked), staging_left)| HostPointers {
            host: current.host.clone(),
            current: target(current),
            last_worked: target(last_worked),
            staging_left,
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub removed: Vec<String>,
    /// Outside the keep window but still pointed at.
    pub protected: Vec<String>,
}

/// Delete releases outside the newest `keep`.
///
/// Releases `current` or `last-worked` point at on any host are kept.
pub async fn prune_releases(
    ctx: TransitionContext<'_>,
    layout: &ReleaseLayout,
    keep: usize,
    diagnostics: &mut Diagnostics,
) -> PruneSummary {
    let mut summary = PruneSummary::default();

    let listing = match ctx.remote.list_dirs(&layout.root).await {
        Ok(listing) => listing,
        Err(e) => {
            diagnostics.warn(Warning::prune(format!(
                "can't list releases in {}: {e}",
                layout.root
            )));
            return summary;
        }
    };
    if let Some(report) = listing.unsynced_report() {
        diagnostics.warn(Warning::unsynced_hosts(report));
    }

    let releases = ReleaseSet::from_names(&layout.root, &listing.dirs);
    let candidates = releases.prune(keep);
    if candidates.is_empty() {
        tracing::debug!(count = releases.len(), keep, "nothing to prune");
        return summary;
    }

    let pinned = match read_pointers(ctx.remote, layout).await {
        Ok(pointers) => pinned_names(&pointers),
        Err(e) => {
            diagnostics.warn(Warning::prune(format!(
                "can't read pointers, skipping prune: {e}"
            )));
            return summary;
        }
    };

    ctx.output.section("Removing old releases...");
    for release in candidates {
        if pinned.contains(release.name.as_str()) {
            summary.protected.push(release.name);
            continue;
        }
        match ctx.remote.run(&shell::remove_dir(&release.path)).await {
            Ok(_) => {
                ctx.output.progress(&format!("removed {}", release.name));
                summary.removed.push(release.name);
            }
            Err(e) => diagnostics.warn(Warning::prune(format!("{}: {e}", release.name))),
        }
    }
    summary
}

fn pinned_names(pointers: &[HostPointers]) -> HashSet<String> {
    pointers
        .iter()
        .flat_map(|p| [p.current.as_deref(), p.last_worked.as_deref()])
        .flatten()
        .map(|target| shell::basename(target).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_names_cover_both_pointers_on_every_host() {
        let pointers = [
            HostPointers {
                host: "app1".to_string(),
                current: Some("/srv/releases/release-1.1-3".to_string()),
                last_worked: Some("/srv/releases/release-1.1-2/".to_string()),
                staging_left: false,
            },
            HostPointers {
                host: "app2".to_string(),
                current: Some("/srv/releases/release-1.1-1".to_string()),
                last_worked: None,
                staging_left: true,
            },
        ];
        let pinned = pinned_names(&pointers);
        assert_eq!(pinned.len(), 3);
        assert!(pinned.contains("release-1.1-2"));
        assert!(pinned.contains("release-1.1-1"));
    }
}
