// ABOUTME: Rollback command implementation.
// ABOUTME: Repoints current at the previous release on every server.

use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::Result;
use relink::output::Output;
use relink::transition::{Fallback, RollbackSettings, RollbackTransition, TransitionContext};

use super::{Operator, connect, emit_warnings, failed, report_outcome};

pub async fn rollback(config: Config, operator: &Operator, mut output: Output) -> Result<()> {
    let settings = RollbackSettings::from_config(&config)?;

    output.start_timer();
    let fleet = connect(&config, &output).await?;

    let ctx = TransitionContext::new(
        &fleet,
        operator.gate.as_ref(),
        operator.opener.as_ref(),
        &output,
    );
    let result = RollbackTransition::new(ctx, &settings).run().await;

    let mut diag = Diagnostics::default();
    fleet.disconnect(&mut diag).await;

    let report = match result {
        Ok(report) => report,
        Err(e) => return Err(failed(diag, e.into(), &output)),
    };
    diag.absorb(report.diagnostics().clone());
    emit_warnings(&diag, &output);

    let fallback = Fallback::new(&settings.layout, report.session.last_worked_target.clone());
    report_outcome(&report, Some(fallback), "Rollback complete!", &output);
    Ok(())
}
