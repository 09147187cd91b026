// ABOUTME: Resolves which targets a transition works on.
// ABOUTME: Lists recursive parents remotely, then selects by name or by asking.

use std::collections::HashMap;

use super::TransitionContext;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::remote::shell;
use crate::targets::{
    TargetSpec, UpdateTarget, ensure_selected, expand_targets, parse_selection, recursive_parents,
    select_targets,
};

/// Expand `configured` under `base` and pick the targets to work on.
///
/// With `requested` names, those are selected. Otherwise every target is
/// offered through the gate.
pub async fn resolve_targets(
    ctx: TransitionContext<'_>,
    configured: &[TargetSpec],
    base: &str,
    requested: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<UpdateTarget>> {
    let mut listings = HashMap::new();
    for parent in recursive_parents(configured) {
        let listing = ctx
            .remote
            .list_dirs(&shell::join(base, &parent.path))
            .await?;
        if let Some(report) = listing.unsynced_report() {
            diagnostics.warn(Warning::unsynced_hosts(report));
        }
        listings.insert(parent.id.clone(), listing.dirs);
    }
    let all = expand_targets(configured, &listings)?;

    let names = parse_selection(requested);
    if !names.is_empty() {
        return Ok(select_targets(all, &names)?);
    }

    let mut chosen = Vec::new();
    for target in all {
        let question = match &target.description {
            Some(description) => format!("Include {} ({description})?", target.label()),
            None => format!("Include {}?", target.label()),
        };
        if ctx.gate.confirm(&question, true).await {
            chosen.push(target);
        }
    }
    Ok(ensure_selected(chosen)?)
}
