// ABOUTME: Per-invocation state threaded through every phase of a transition.
// ABOUTME: Phases take the session by value and hand back the updated one.

use super::Phase;
use crate::detect::MigrationReport;
use crate::diagnostics::Diagnostics;
use crate::targets::UpdateTarget;

/// State of one running transition. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct TransitionSession {
    pub targets: Vec<UpdateTarget>,
    /// Set once `current` has been repointed.
    pub need_fallback: bool,
    /// Set when any target's diff carries migrations.
    pub run_migrations: bool,
    /// Release `current` is moved to: the new release for updates, the
    /// previous one for rollbacks.
    pub release_path: Option<String>,
    /// Where `current` pointed before the transition touched it.
    pub current_release: Option<String>,
    /// Where `last-worked` was pointed by SetLastWorked.
    pub last_worked_target: Option<String>,
    /// Operator commands for applying detected migrations.
    pub reminders: Vec<String>,
    /// Index of the sync target being worked on.
    pub focus: usize,
    /// Findings of the sync target being worked on.
    pub findings: SyncFindings,
    pub diagnostics: Diagnostics,
}

impl TransitionSession {
    pub fn new(targets: Vec<UpdateTarget>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub(crate) fn focused(&self) -> Option<&UpdateTarget> {
        self.targets.get(self.focus)
    }
}

/// What the advisory detectors found for one sync target.
#[derive(Debug, Clone, Default)]
pub struct SyncFindings {
    pub migrations: Option<MigrationReport>,
    pub manifest_changed: bool,
    pub sample_config: Option<String>,
    pub indexes_changed: bool,
    /// Operator-facing lines shown before the confirmation gate.
    pub notes: Vec<String>,
}

impl SyncFindings {
    pub fn has_general_migrations(&self) -> bool {
        self.migrations
            .as_ref()
            .is_some_and(|report| report.general.has_migrations)
    }
}

/// How a transition that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator declined a gate.
    Declined { phase: Phase },
    /// Rollback found `current` at the oldest release.
    OldestRelease { current: String },
    /// The operator stopped the host-by-host restart.
    RestartStopped { restarted: Vec<String> },
}

/// Final state of a transition that did not fail.
#[derive(Debug)]
pub struct Report {
    pub outcome: Outcome,
    pub session: TransitionSession,
}

impl Report {
    /// Whether `current` was repointed during the transition.
    pub fn pointers_changed(&self) -> bool {
        self.session.need_fallback
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.session.diagnostics
    }
}
