// ABOUTME: Prune command implementation.
// ABOUTME: Removes releases outside the keep window after a confirmation.

use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::{Error, Result};
use relink::output::Output;
use relink::release::ReleaseLayout;
use relink::transition::{TransitionContext, prune_releases};

use super::{Operator, connect, emit_warnings};

pub async fn prune(
    config: Config,
    keep: Option<usize>,
    operator: &Operator,
    mut output: Output,
) -> Result<()> {
    let releases = config.releases()?;
    let keep = keep.unwrap_or(releases.keep_releases);
    if keep == 0 {
        return Err(Error::InvalidConfig("--keep must be at least 1".to_string()));
    }
    let layout = ReleaseLayout::new(&releases.releases, &releases.current);

    output.start_timer();
    let fleet = connect(&config, &output).await?;
    let mut diag = Diagnostics::default();

    let ctx = TransitionContext::new(
        &fleet,
        operator.gate.as_ref(),
        operator.opener.as_ref(),
        &output,
    );
    let question = format!("Do you want to remove releases older than the newest {keep}?");
    let summary = if ctx.gate.confirm(&question, true).await {
        Some(prune_releases(ctx, &layout, keep, &mut diag).await)
    } else {
        None
    };

    fleet.disconnect(&mut diag).await;
    emit_warnings(&diag, &output);

    match summary {
        Some(summary) => {
            if !summary.protected.is_empty() {
                output.progress(&format!(
                    "kept releases still in use: {}",
                    summary.protected.join(", ")
                ));
            }
            output.success(&format!("Removed {} release(s)", summary.removed.len()));
        }
        None => output.success("Nothing removed"),
    }
    Ok(())
}
