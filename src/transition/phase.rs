// ABOUTME: Phases of the update, rollback, and sync transitions and their order.
// ABOUTME: Also marks the phases that repoint the live pointer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    ResetPermissions,
    Stage,
    SaveHead,
    Update,
    MigrationCheck,
    ReadCurrent,
    FindPrevious,
    CheckBranch,
    Fetch,
    Detect,
    Confirm,
    SetLastWorked,
    CutOver,
    Relink,
    HardReset,
    Install,
    MigrateTask,
    ShowResults,
    Verify,
    ConfirmRestart,
    Restart,
    ShowStatus,
    Prune,
}

pub const UPDATE_PHASES: &[Phase] = &[
    Phase::ResetPermissions,
    Phase::Stage,
    Phase::SaveHead,
    Phase::Update,
    Phase::MigrationCheck,
    Phase::Confirm,
    Phase::SetLastWorked,
    Phase::CutOver,
    Phase::Verify,
    Phase::ConfirmRestart,
    Phase::Restart,
    Phase::ShowStatus,
    Phase::Prune,
];

pub const ROLLBACK_PHASES: &[Phase] = &[
    Phase::ReadCurrent,
    Phase::FindPrevious,
    Phase::Confirm,
    Phase::SetLastWorked,
    Phase::Relink,
    Phase::Verify,
    Phase::ConfirmRestart,
    Phase::Restart,
];

/// Run once per selected sync target, in target order.
pub const SYNC_TARGET_PHASES: &[Phase] = &[
    Phase::CheckBranch,
    Phase::ResetPermissions,
    Phase::Fetch,
    Phase::Detect,
    Phase::Confirm,
    Phase::HardReset,
    Phase::Install,
    Phase::MigrateTask,
    Phase::ShowResults,
];

/// Run once after every sync target is done.
pub const SYNC_FINISH_PHASES: &[Phase] =
    &[Phase::ConfirmRestart, Phase::Restart, Phase::ShowStatus];

impl Phase {
    /// Phases that repoint `current`.
    pub fn moves_current(self) -> bool {
        matches!(self, Phase::CutOver | Phase::Relink)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResetPermissions => "reset permissions",
            Phase::Stage => "stage",
            Phase::SaveHead => "save head",
            Phase::Update => "update",
            Phase::MigrationCheck => "migration check",
            Phase::ReadCurrent => "read current",
            Phase::FindPrevious => "find previous",
            Phase::CheckBranch => "check branch",
            Phase::Fetch => "fetch",
            Phase::Detect => "detect changes",
            Phase::Confirm => "confirm",
            Phase::SetLastWorked => "set last-worked",
            Phase::CutOver => "cut over",
            Phase::Relink => "relink",
            Phase::HardReset => "hard reset",
            Phase::Install => "install",
            Phase::MigrateTask => "migrate task",
            Phase::ShowResults => "show results",
            Phase::Verify => "verify",
            Phase::ConfirmRestart => "confirm restart",
            Phase::Restart => "restart",
            Phase::ShowStatus => "show status",
            Phase::Prune => "prune",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(phases: &[Phase], phase: Phase) -> usize {
        phases.iter().position(|p| *p == phase).unwrap()
    }

    #[test]
    fn update_confirms_before_touching_pointers() {
        let confirm = position(UPDATE_PHASES, Phase::Confirm);
        assert!(confirm < position(UPDATE_PHASES, Phase::SetLastWorked));
        assert!(
            position(UPDATE_PHASES, Phase::SetLastWorked) < position(UPDATE_PHASES, Phase::CutOver)
        );
        assert!(position(UPDATE_PHASES, Phase::Restart) < position(UPDATE_PHASES, Phase::Prune));
    }

    #[test]
    fn rollback_captures_last_worked_before_relink() {
        assert!(
            position(ROLLBACK_PHASES, Phase::SetLastWorked)
                < position(ROLLBACK_PHASES, Phase::Relink)
        );
        assert!(!ROLLBACK_PHASES.contains(&Phase::Stage));
    }

    #[test]
    fn only_pointer_phases_move_current() {
        let movers: Vec<_> = UPDATE_PHASES
            .iter()
            .chain(ROLLBACK_PHASES)
            .chain(SYNC_TARGET_PHASES)
            .filter(|p| p.moves_current())
            .collect();
        assert_eq!(movers, [&Phase::CutOver, &Phase::Relink]);
    }
}
