// ABOUTME: Update command implementation.
// ABOUTME: Selects targets, names the new release, and runs the update transition.

use chrono::Local;
use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::{Error, Result};
use relink::output::Output;
use relink::release::ReleaseSnapshot;
use relink::transition::{
    Fallback, TransitionContext, UpdateSettings, UpdateTransition, resolve_targets,
};

use super::{Operator, connect, emit_warnings, failed, report_outcome};

/// Stage, update, and cut over to a new release on every server.
pub async fn update(
    config: Config,
    selection: Vec<String>,
    operator: &Operator,
    mut output: Output,
) -> Result<()> {
    let settings = UpdateSettings::from_config(&config)?;
    let configured = config.update_targets()?;
    let label = config.releases()?.release_label.clone();

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
        let targets = resolve_targets(
            ctx,
            &configured,
            &settings.layout.current,
            &selection,
            &mut diag,
        )
        .await?;

        let release = ReleaseSnapshot::name_for(&label, &Local::now());
        output.progress(&format!("New release: {release}"));
        let report = UpdateTransition::new(ctx, &settings, &release)
            .run(targets)
            .await?;
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

    let fallback = Fallback::new(&settings.layout, report.session.last_worked_target.clone());
    report_outcome(&report, Some(fallback), "Update complete!", &output);
    Ok(())
}
