// ABOUTME: Command module aggregator for the relink CLI.
// ABOUTME: Holds the helpers every command shares: connecting and reporting.

mod log;
mod prune;
mod rollback;
mod status;
mod sync;
mod update;

pub use log::log;
pub use prune::prune;
pub use rollback::rollback;
pub use status::status;
pub use sync::sync;
pub use update::update;

use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::{Error, Result};
use relink::output::Output;
use relink::prompt::{AssumeYes, ConfirmationGate, NoopOpener, SystemOpener, TerminalGate, UrlOpener};
use relink::remote::SshFleet;
use relink::transition::{Fallback, Outcome, Report};

/// How the operator is asked and what happens with URLs.
pub struct Operator {
    pub gate: Box<dyn ConfirmationGate>,
    pub opener: Box<dyn UrlOpener>,
}

impl Operator {
    pub fn new(assume_yes: bool, no_open: bool) -> Self {
        let gate: Box<dyn ConfirmationGate> = if assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(TerminalGate)
        };
        let opener: Box<dyn UrlOpener> = if no_open {
            Box::new(NoopOpener)
        } else {
            Box::new(SystemOpener)
        };
        Self { gate, opener }
    }
}

/// Open one session per configured server.
async fn connect(config: &Config, output: &Output) -> Result<SshFleet> {
    output.progress(&format!(
        "Connecting to {} server(s)...",
        config.servers.len()
    ));
    SshFleet::connect(
        config.servers.iter(),
        config.command_timeout,
        output.echoes_remote_output(),
    )
    .await
}

/// Print collected warnings once, at the end of a command.
fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}

/// Print the warnings gathered before `error`, including those carried by a
/// failed transition, and hand the error back.
fn failed(mut diag: Diagnostics, error: Error, output: &Output) -> Error {
    if let Error::Transition(transition) = &error {
        diag.absorb(transition.diagnostics().clone());
    }
    emit_warnings(&diag, output);
    error
}

/// Report how a transition ended.
fn report_outcome(report: &Report, fallback: Option<Fallback>, done: &str, output: &Output) {
    match &report.outcome {
        Outcome::Completed => output.success(done),
        Outcome::Declined { phase } => output.success(&format!("Stopped at {phase}: declined")),
        Outcome::OldestRelease { current } => output.success(&format!(
            "Nothing to roll back to: {current} is the oldest release"
        )),
        Outcome::RestartStopped { restarted } => output.success(&format!(
            "Restart stopped; restarted: {}",
            if restarted.is_empty() {
                "none".to_string()
            } else {
                restarted.join(", ")
            }
        )),
    }

    if report.outcome != Outcome::Completed
        && report.pointers_changed()
        && let Some(fallback) = fallback
    {
        output.warning(&fallback.to_string());
    }
}
