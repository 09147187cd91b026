// ABOUTME: Sequential phase driver shared by every transition.
// ABOUTME: Labels failures with their phase and attaches the fallback after cutover.

use async_trait::async_trait;
use snafu::ResultExt;

use super::error::{AfterCutoverSnafu, Fallback, PhaseError, PhaseSnafu, TransitionError};
use super::{Outcome, Phase, Report, TransitionSession};

/// What a phase hands back to the driver.
pub(crate) enum Step {
    Next(TransitionSession),
    Halt(TransitionSession, Outcome),
}

#[async_trait]
pub(crate) trait PhaseRunner: Send + Sync {
    async fn run_phase(
        &self,
        phase: Phase,
        session: TransitionSession,
    ) -> Result<Step, PhaseError>;

    /// Manual recovery for this transition, if it manages release pointers.
    fn fallback(&self, session: &TransitionSession) -> Option<Fallback>;
}

/// Run `phases` in order until one halts, fails, or all complete.
///
/// A failure in a phase that moves `current`, or in any phase after one did,
/// becomes [`TransitionError::AfterCutover`] carrying the fallback. Either
/// error keeps the warnings recorded so far.
pub(crate) async fn drive(
    runner: &dyn PhaseRunner,
    phases: &[Phase],
    mut session: TransitionSession,
) -> Result<Report, TransitionError> {
    for &phase in phases {
        let fallback = if session.need_fallback || phase.moves_current() {
            runner.fallback(&session)
        } else {
            None
        };

        let diagnostics = session.diagnostics.clone();

        tracing::debug!(%phase, "entering phase");
        let result = runner.run_phase(phase, session).await;
        let step = match fallback {
            Some(fallback) => result.context(AfterCutoverSnafu {
                phase,
                fallback,
                diagnostics,
            })?,
            None => result.context(PhaseSnafu { phase, diagnostics })?,
        };

        match step {
            Step::Next(next) => session = next,
            Step::Halt(session, outcome) => {
                tracing::info!(%phase, ?outcome, "transition halted");
                return Ok(Report { outcome, session });
            }
        }
    }

    Ok(Report {
        outcome: Outcome::Completed,
        session,
    })
}
