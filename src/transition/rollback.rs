// ABOUTME: ROLLBACK transition: repoint current at the release before it.
// ABOUTME: Relinks an existing snapshot; never stages or copies anything.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;

use super::pipeline::{PhaseRunner, Step, drive};
use super::pointers::{capture_last_worked, note_disagreement, read_current, verify_current};
use super::restart::{RestartSettings, confirm_restart, restart_hosts, unique_urls};
use super::{
    Fallback, Outcome, Phase, PhaseError, Report, ROLLBACK_PHASES, TransitionContext,
    TransitionError, TransitionSession,
};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::release::{DirListing, PreviousRelease, ReleaseLayout, ReleaseSet};
use crate::remote::shell;
use crate::targets::{TargetSpec, expand_targets, recursive_parents};

#[derive(Debug, Clone)]
pub struct RollbackSettings {
    pub layout: ReleaseLayout,
    /// Targets whose history is shown before confirming.
    pub targets: Vec<TargetSpec>,
    pub restart: RestartSettings,
}

impl RollbackSettings {
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let releases = config.releases()?;
        Ok(Self {
            layout: ReleaseLayout::new(&releases.releases, &releases.current),
            targets: config.update_targets()?,
            restart: RestartSettings::from_config(config),
        })
    }
}

pub struct RollbackTransition<'a> {
    ctx: TransitionContext<'a>,
    settings: &'a RollbackSettings,
}

impl<'a> RollbackTransition<'a> {
    pub fn new(ctx: TransitionContext<'a>, settings: &'a RollbackSettings) -> Self {
        Self { ctx, settings }
    }

    pub async fn run(&self) -> Result<Report, TransitionError> {
        tracing::info!(root = %self.settings.layout.root, "starting rollback");
        drive(self, ROLLBACK_PHASES, TransitionSession::default()).await
    }

    fn layout(&self) -> &ReleaseLayout {
        &self.settings.layout
    }

    /// The release chosen by FindPrevious.
    fn previous(&self, session: &TransitionSession) -> Result<String, PhaseError> {
        session
            .release_path
            .clone()
            .ok_or_else(|| PhaseError::ReleaseNotListed {
                name: session.current_release.clone().unwrap_or_default(),
                root: self.layout().root.clone(),
            })
    }

    async fn find_previous(&self, mut session: TransitionSession) -> Result<Step, PhaseError> {
        let root = &self.layout().root;
        let listing = self.ctx.remote.list_dirs(root).await?;
        note_unsynced(&mut session.diagnostics, &listing);

        let current = session.current_release.clone().unwrap_or_default();
        let name = shell::basename(&current).to_string();
        match ReleaseSet::from_names(root, &listing.dirs).find_previous(&name) {
            PreviousRelease::Found(previous) => {
                self.ctx
                    .output
                    .progress(&format!("Previous release: {}", previous.name));
                session.release_path = Some(previous.path);
                Ok(Step::Next(session))
            }
            PreviousRelease::OldestRelease => {
                self.ctx.output.warning("Current release is the oldest one!");
                Ok(Step::Halt(session, Outcome::OldestRelease { current }))
            }
            PreviousRelease::NotFound => Err(PhaseError::ReleaseNotListed {
                name,
                root: root.clone(),
            }),
        }
    }

    /// Expand targets inside `release` and show their history.
    async fn show_history(
        &self,
        release: &str,
        mut session: TransitionSession,
    ) -> Result<TransitionSession, PhaseError> {
        let configured = &self.settings.targets;
        let mut listings = HashMap::new();
        for parent in recursive_parents(configured) {
            let listing = self
                .ctx
                .remote
                .list_dirs(&shell::join(release, &parent.path))
                .await?;
            note_unsynced(&mut session.diagnostics, &listing);
            listings.insert(parent.id.clone(), listing.dirs);
        }
        session.targets = expand_targets(configured, &listings)?;

        self.ctx.output.section("Release history:");
        let reads = session.targets.iter().map(|target| async move {
            let command = shell::git_history_graph(&shell::join(release, &target.path));
            self.ctx.remote.texts(&command).await
        });
        let histories = join_all(reads).await;
        for (target, history) in session.targets.iter().zip(histories) {
            match history {
                Ok(history) => self.ctx.output.block(
                    &target.label(),
                    history.first().map(String::as_str).unwrap_or_default(),
                ),
                Err(e) => session.diagnostics.warn(Warning::detection(format!(
                    "{}: can't read history: {e}",
                    target.id
                ))),
            }
        }
        Ok(session)
    }
}

fn note_unsynced(diagnostics: &mut Diagnostics, listing: &DirListing) {
    if let Some(report) = listing.unsynced_report() {
        diagnostics.warn(Warning::unsynced_hosts(report));
    }
}

#[async_trait]
impl PhaseRunner for RollbackTransition<'_> {
    async fn run_phase(
        &self,
        phase: Phase,
        mut session: TransitionSession,
    ) -> Result<Step, PhaseError> {
        let ctx = self.ctx;
        match phase {
            Phase::ReadCurrent => {
                ctx.output.section("Reading current release...");
                let targets = read_current(ctx, self.layout()).await?;
                note_disagreement(&mut session, ctx.remote.hosts(), "current release", &targets);
                session.current_release = targets.into_iter().next();
            }
            Phase::FindPrevious => return self.find_previous(session).await,
            Phase::Confirm => {
                let previous = self.previous(&session)?;
                session = self.show_history(&previous, session).await?;
                if !ctx.gate.confirm("Do you want to rollback?", true).await {
                    return Ok(Step::Halt(session, Outcome::Declined { phase }));
                }
            }
            Phase::SetLastWorked => {
                session = capture_last_worked(ctx, self.layout(), session).await?;
            }
            Phase::Relink => {
                let previous = self.previous(&session)?;
                ctx.output.section("Rolling back...");
                ctx.remote.relink(&previous, &self.layout().current).await?;
                session.need_fallback = true;
            }
            Phase::Verify => {
                let previous = self.previous(&session)?;
                verify_current(ctx, self.layout(), &previous).await?;
                ctx.output.progress(&format!("{previous} is set as current"));
            }
            Phase::ConfirmRestart => {
                if !confirm_restart(ctx).await {
                    return Ok(Step::Halt(session, Outcome::Declined { phase }));
                }
            }
            Phase::Restart => {
                let urls = unique_urls(session.targets.iter().map(|t| t.open_url.as_ref()));
                if let Some(outcome) = restart_hosts(ctx, &self.settings.restart, &urls).await? {
                    return Ok(Step::Halt(session, outcome));
                }
            }
            other => tracing::debug!(phase = %other, "not a rollback phase"),
        }
        Ok(Step::Next(session))
    }

    fn fallback(&self, session: &TransitionSession) -> Option<Fallback> {
        Some(Fallback::new(
            self.layout(),
            session.last_worked_target.clone(),
        ))
    }
}
