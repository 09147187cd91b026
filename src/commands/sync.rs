// ABOUTME: Sync command implementation.
// ABOUTME: Resets live targets to their remote branch, one target at a time.

use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::{Error, Result};
use relink::output::Output;
use relink::transition::{SyncSettings, SyncTransition, TransitionContext, resolve_targets};

use super::{Operator, connect, emit_warnings, failed, report_outcome};

pub async fn sync(
    config: Config,
    selection: Vec<String>,
    force: bool,
    operator: &Operator,
    mut output: Output,
) -> Result<()> {
    let settings = SyncSettings::from_config(&config, force);
    let configured = config.sync_targets();

    output.start_timer();
    let fleet = connect(&config, &output).await?;
    let mut diag = Diagnostics::default();

    let result = async {
        let ctx = TransitionContext::new(
            &fleet,
            operator.gate.as_ref(),
            operator.opener.as_ref(),
            &output,
        );
        let targets = resolve_targets(ctx, &configured, "", &selection, &mut diag).await?;
        let report = SyncTransition::new(ctx, &settings).run(targets).await?;
        Ok::<_, Error>(report)
    }
    .await;

    fleet.disconnect(&mut diag).await;

    let report = match result {
        Ok(report) => report,
        Err(e) => return Err(failed(diag, e, &output)),
    };
    diag.absorb(report.diagnostics().clone());
    emit_warnings(&diag, &output);

    report_outcome(&report, None, "Sync complete!", &output);
    Ok(())
}
