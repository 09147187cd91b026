// ABOUTME: Transition errors labelled with the phase that failed.
// ABOUTME: Failures after the pointer moved carry the manual rollback instruction.

use snafu::Snafu;
use std::fmt;

use super::Phase;
use crate::diagnostics::Diagnostics;
use crate::release::ReleaseLayout;
use crate::remote::RemoteError;
use crate::targets::TargetError;

/// Why a single phase failed.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("{host}: can't read the current release")]
    CurrentUnreadable { host: String },

    #[error("{host}: current release didn't change (expected {expected}, found {actual})")]
    CurrentUnchanged {
        host: String,
        expected: String,
        actual: String,
    },

    #[error("Can't find current release {name} in {root}")]
    ReleaseNotListed { name: String, root: String },

    #[error("{target}: can't read the revision before update")]
    EmptyHead { target: String },

    #[error("{host}: current branch is {found}, expected {expected}")]
    BranchMismatch {
        host: String,
        found: String,
        expected: String,
    },
}

/// Manual recovery once `current` has been repointed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub current: String,
    pub last_worked: String,
    /// Where `last-worked` pointed when the transition captured it.
    pub last_worked_target: Option<String>,
}

impl Fallback {
    pub fn new(layout: &ReleaseLayout, last_worked_target: Option<String>) -> Self {
        Self {
            current: layout.current.clone(),
            last_worked: layout.last_worked.clone(),
            last_worked_target,
        }
    }

    pub fn command(&self) -> String {
        format!(
            "ln -nfs `readlink {}` {}",
            self.last_worked, self.current
        )
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current release is changed! To rollback run: {}",
            self.command()
        )?;
        if let Some(target) = &self.last_worked_target {
            write!(f, " (last-worked -> {target})")?;
        }
        Ok(())
    }
}

/// A transition that stopped on a failed phase.
///
/// Both variants keep the warnings recorded by the phases that completed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransitionError {
    #[snafu(display("{phase} failed: {source}"))]
    Phase {
        phase: Phase,
        source: PhaseError,
        diagnostics: Diagnostics,
    },

    #[snafu(display("{phase} failed: {source}\nWarning: {fallback}"))]
    AfterCutover {
        phase: Phase,
        source: PhaseError,
        fallback: Fallback,
        diagnostics: Diagnostics,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionErrorKind {
    /// Live pointer untouched.
    Preflight,
    /// Live pointer already moved; manual rollback may be needed.
    Cutover,
}

impl TransitionError {
    pub fn kind(&self) -> TransitionErrorKind {
        match self {
            TransitionError::Phase { .. } => TransitionErrorKind::Preflight,
            TransitionError::AfterCutover { .. } => TransitionErrorKind::Cutover,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            TransitionError::Phase { phase, .. } | TransitionError::AfterCutover { phase, .. } => {
                *phase
            }
        }
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        match self {
            TransitionError::AfterCutover { fallback, .. } => Some(fallback),
            TransitionError::Phase { .. } => None,
        }
    }

    /// Warnings recorded before the failing phase.
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            TransitionError::Phase { diagnostics, .. }
            | TransitionError::AfterCutover { diagnostics, .. } => diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> Fallback {
        Fallback {
            current: "/srv/app".to_string(),
            last_worked: "/srv/releases/last-worked".to_string(),
            last_worked_target: Some("/srv/releases/release-01.02.2024-1".to_string()),
        }
    }

    #[test]
    fn fallback_names_the_relink_command() {
        let text = fallback().to_string();
        assert!(text.starts_with("Current release is changed!"));
        assert!(text.contains("ln -nfs `readlink /srv/releases/last-worked` /srv/app"));
        assert!(text.contains("release-01.02.2024-1"));
    }

    #[test]
    fn kind_follows_variant() {
        let before = TransitionError::Phase {
            phase: Phase::Stage,
            source: PhaseError::EmptyHead {
                target: "core".to_string(),
            },
            diagnostics: Diagnostics::default(),
        };
        assert_eq!(before.kind(), TransitionErrorKind::Preflight);
        assert!(before.fallback().is_none());

        let after = TransitionError::AfterCutover {
            phase: Phase::Verify,
            source: PhaseError::CurrentUnchanged {
                host: "app1".to_string(),
                expected: "/a".to_string(),
                actual: "/b".to_string(),
            },
            fallback: fallback(),
            diagnostics: Diagnostics::default(),
        };
        assert_eq!(after.kind(), TransitionErrorKind::Cutover);
        assert_eq!(after.phase(), Phase::Verify);
        let message = after.to_string();
        assert!(message.contains("current release didn't change"));
        assert!(message.contains("Warning: Current release is changed!"));
    }
}
