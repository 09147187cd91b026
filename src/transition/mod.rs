// ABOUTME: Release-state transition engine: update, rollback, and sync.
// ABOUTME: A single driver runs ordered phases and applies the failure policy.

mod error;
mod housekeeping;
mod phase;
mod pipeline;
mod pointers;
mod restart;
mod rollback;
mod selection;
mod session;
mod sync;
mod update;

pub use error::{Fallback, PhaseError, TransitionError, TransitionErrorKind};
pub use housekeeping::{HostPointers, PruneSummary, prune_releases, read_pointers};
pub use phase::{Phase, ROLLBACK_PHASES, SYNC_FINISH_PHASES, SYNC_TARGET_PHASES, UPDATE_PHASES};
pub use restart::RestartSettings;
pub use rollback::{RollbackSettings, RollbackTransition};
pub use selection::resolve_targets;
pub use session::{Outcome, Report, SyncFindings, TransitionSession};
pub use sync::{SyncSettings, SyncTransition};
pub use update::{UpdateSettings, UpdateTransition};

use crate::output::Output;
use crate::prompt::{ConfirmationGate, UrlOpener};
use crate::remote::{RemoteExecutor, RemoteOps};

/// Collaborators every transition talks to.
#[derive(Clone, Copy)]
pub struct TransitionContext<'a> {
    pub remote: RemoteOps<'a>,
    pub gate: &'a dyn ConfirmationGate,
    pub opener: &'a dyn UrlOpener,
    pub output: &'a Output,
}

impl<'a> TransitionContext<'a> {
    pub fn new(
        executor: &'a dyn RemoteExecutor,
        gate: &'a dyn ConfirmationGate,
        opener: &'a dyn UrlOpener,
        output: &'a Output,
    ) -> Self {
        Self {
            remote: RemoteOps::new(executor),
            gate,
            opener,
            output,
        }
    }
}
