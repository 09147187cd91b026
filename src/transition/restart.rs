// ABOUTME: Restart and status steps shared by every transition.
// ABOUTME: Restarts one host at a time with an operator gate between hosts.

use std::time::Duration;

use super::{Outcome, PhaseError, TransitionContext};
use crate::remote::RemoteCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartSettings {
    pub restart_script: Option<String>,
    pub show_status_script: Option<String>,
    /// Wait before asking for status.
    pub status_delay: Duration,
}

/// Ask before restarting anything.
pub(crate) async fn confirm_restart(ctx: TransitionContext<'_>) -> bool {
    ctx.gate
        .confirm("Do you want to restart the servers?", true)
        .await
}

/// Restart hosts one by one, opening `urls` after each.
///
/// Returns an outcome when the operator stops between hosts.
pub(crate) async fn restart_hosts(
    ctx: TransitionContext<'_>,
    settings: &RestartSettings,
    urls: &[String],
) -> Result<Option<Outcome>, PhaseError> {
    let Some(script) = &settings.restart_script else {
        ctx.output
            .progress("restart_script is not configured, skipping restart");
        return Ok(None);
    };

    let command = RemoteCommand::new(script.clone());
    let mut restarted = Vec::new();
    for (index, host) in ctx.remote.hosts().iter().enumerate() {
        if index > 0
            && !ctx
                .gate
                .confirm("Continue task on the next server?", true)
                .await
        {
            tracing::info!(?restarted, "restart stopped by operator");
            return Ok(Some(Outcome::RestartStopped { restarted }));
        }

        ctx.output.section(&format!("Restarting {host}..."));
        ctx.remote.run_on(index, &command).await?;
        restarted.push(host.clone());

        for url in urls {
            ctx.opener.open(url).await;
        }
    }
    Ok(None)
}

/// Print the status script's output per host after the settle delay.
pub(crate) async fn show_status(
    ctx: TransitionContext<'_>,
    settings: &RestartSettings,
) -> Result<(), PhaseError> {
    let Some(script) = &settings.show_status_script else {
        return Ok(());
    };

    tokio::time::sleep(settings.status_delay).await;
    ctx.output.section("Server status:");
    let outputs = ctx
        .remote
        .run(&RemoteCommand::new(script.clone()).muted())
        .await?;
    for output in outputs {
        ctx.output.block(&format!("[{}]", output.host), output.text());
    }
    Ok(())
}

/// Distinct URLs in first-seen order.
pub(crate) fn unique_urls<'a>(urls: impl IntoIterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for url in urls.into_iter().flatten() {
        if !unique.contains(url) {
            unique.push(url.clone());
        }
    }
    unique
}
