// ABOUTME: Pointer steps shared by update and rollback.
// ABOUTME: Captures last-worked per host and verifies where current points.

use futures::future::join_all;

use super::{PhaseError, TransitionContext, TransitionSession};
use crate::diagnostics::Warning;
use crate::release::ReleaseLayout;
use crate::remote::{RemoteCommand, shell};

/// Where `current` points on every host, in host order.
pub(crate) async fn read_current(
    ctx: TransitionContext<'_>,
    layout: &ReleaseLayout,
) -> Result<Vec<String>, PhaseError> {
    let targets = ctx.remote.readlink(&layout.current).await?;
    for (host, target) in ctx.remote.hosts().iter().zip(&targets) {
        if target.is_empty() {
            return Err(PhaseError::CurrentUnreadable { host: host.clone() });
        }
    }
    Ok(targets)
}

/// Record a warning when hosts disagree on `values`.
pub(crate) fn note_disagreement(
    session: &mut TransitionSession,
    hosts: &[String],
    what: &str,
    values: &[String],
) {
    let Some(first) = values.first() else {
        return;
    };
    let differing: Vec<String> = hosts
        .iter()
        .zip(values)
        .filter(|(_, value)| *value != first)
        .map(|(host, value)| format!("{host}: {value}"))
        .collect();
    if !differing.is_empty() {
        session.diagnostics.warn(Warning::host_mismatch(format!(
            "{what} differs between hosts (first host: {first}; {})",
            differing.join(", ")
        )));
    }
}

/// Point `last-worked` on each host at that host's own `current`.
pub(crate) async fn capture_last_worked(
    ctx: TransitionContext<'_>,
    layout: &ReleaseLayout,
    mut session: TransitionSession,
) -> Result<TransitionSession, PhaseError> {
    ctx.output.section("Saving last worked release...");
    let targets = read_current(ctx, layout).await?;
    note_disagreement(&mut session, ctx.remote.hosts(), "current release", &targets);

    let relinks = targets
        .iter()
        .enumerate()
        .map(|(host, target)| ctx.remote.relink_on(host, target, &layout.last_worked));
    join_all(relinks)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(first) = targets.first() {
        ctx.output.progress(&format!("last-worked -> {first}"));
    }
    session.last_worked_target = targets.into_iter().next();
    Ok(session)
}

/// Fail unless `current` points at `expected` on every host.
pub(crate) async fn verify_current(
    ctx: TransitionContext<'_>,
    layout: &ReleaseLayout,
    expected: &str,
) -> Result<(), PhaseError> {
    let actual = ctx.remote.readlink(&layout.current).await?;
    let expected = shell::trim_trailing_slash(expected);
    for (host, target) in ctx.remote.hosts().iter().zip(actual) {
        if shell::trim_trailing_slash(&target) != expected {
            return Err(PhaseError::CurrentUnchanged {
                host: host.clone(),
                expected: expected.to_string(),
                actual: target,
            });
        }
    }
    Ok(())
}

/// Reset ownership of `path`, or run the configured reset script instead.
pub(crate) async fn reset_permissions(
    ctx: TransitionContext<'_>,
    script: Option<&str>,
    owner: Option<&str>,
    path: &str,
) -> Result<(), PhaseError> {
    let command = match (script, owner) {
        (Some(script), _) => RemoteCommand::new(script),
        (None, Some(owner)) => shell::reset_permissions(owner, path),
        (None, None) => return Ok(()),
    };
    ctx.output.section("Resetting permissions...");
    ctx.remote.run(&command).await?;
    if let Some(owner) = owner {
        ctx.output
            .progress(&format!("{path} is reset to {owner}:{owner}"));
    }
    Ok(())
}
