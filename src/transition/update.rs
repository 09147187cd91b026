// ABOUTME: UPDATE transition: stage a copy, pull targets, cut over, restart, prune.
// ABOUTME: Nothing touches the live pointer before the operator confirms.

use async_trait::async_trait;
use futures::future::join_all;

use super::pipeline::{PhaseRunner, Step, drive};
use super::pointers::{capture_last_worked, note_disagreement, reset_permissions, verify_current};
use super::restart::{RestartSettings, confirm_restart, restart_hosts, show_status, unique_urls};
use super::{
    Fallback, Outcome, Phase, PhaseError, Report, TransitionContext, TransitionError,
    TransitionSession, UPDATE_PHASES, prune_releases,
};
use crate::config::Config;
use crate::detect::{APP_CONFIG_FILE, DetectionError, MigrationReport, database_reminders};
use crate::diagnostics::Warning;
use crate::release::ReleaseLayout;
use crate::remote::{RemoteCommand, RemoteError, shell};
use crate::targets::UpdateTarget;

#[derive(Debug, Clone)]
pub struct UpdateSettings {
    pub layout: ReleaseLayout,
    pub keep_releases: usize,
    /// Live tree root; permissions are reset here and `config.json` is read here.
    pub app_path: String,
    pub owner: Option<String>,
    pub reset_dir_script: Option<String>,
    pub install_command: String,
    pub restart: RestartSettings,
}

impl UpdateSettings {
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let releases = config.releases()?;
        Ok(Self {
            layout: ReleaseLayout::new(&releases.releases, &releases.current),
            keep_releases: releases.keep_releases,
            app_path: config.app_path.clone(),
            owner: config.owner.clone(),
            reset_dir_script: config.reset_dir_script.clone(),
            install_command: config.install_command.clone(),
            restart: RestartSettings::from_config(config),
        })
    }
}

impl RestartSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            restart_script: config.restart_script.clone(),
            show_status_script: config.show_status_script.clone(),
            status_delay: config.status_delay,
        }
    }
}

/// Moves every host to a freshly staged release named at construction.
pub struct UpdateTransition<'a> {
    ctx: TransitionContext<'a>,
    settings: &'a UpdateSettings,
    release_path: String,
}

impl<'a> UpdateTransition<'a> {
    pub fn new(ctx: TransitionContext<'a>, settings: &'a UpdateSettings, release_name: &str) -> Self {
        Self {
            ctx,
            settings,
            release_path: settings.layout.release_path(release_name),
        }
    }

    pub async fn run(&self, targets: Vec<UpdateTarget>) -> Result<Report, TransitionError> {
        let mut session = TransitionSession::new(targets);
        session.release_path = Some(self.release_path.clone());
        tracing::info!(release = %self.release_path, targets = session.targets.len(), "starting update");
        drive(self, UPDATE_PHASES, session).await
    }

    fn layout(&self) -> &ReleaseLayout {
        &self.settings.layout
    }

    fn staged(&self, target: &UpdateTarget) -> String {
        shell::join(&self.layout().staging, &target.path)
    }

    async fn stage(&self) -> Result<(), PhaseError> {
        let remote = self.ctx.remote;
        let layout = self.layout();

        self.ctx.output.section("Copying current release...");
        let leftovers = remote.dir_exists(&layout.staging).await?;
        if leftovers.contains(&true) {
            self.ctx
                .output
                .progress("Previous failed update is found. Removing it...");
            remote.run(&shell::remove_dir(&layout.staging)).await?;
        }
        remote
            .run(&shell::copy_tree(&layout.current, &layout.staging))
            .await?;
        remote.run(&shell::remove_logs(&layout.staging)).await?;
        Ok(())
    }

    async fn save_heads(
        &self,
        mut session: TransitionSession,
    ) -> Result<TransitionSession, PhaseError> {
        self.ctx.output.section("Saving current revisions...");
        let reads = session
            .targets
            .iter()
            .map(|target| async move {
                let command = shell::git_head(&self.staged(target));
                self.ctx.remote.texts(&command).await
            });
        let heads: Vec<Vec<String>> = join_all(reads)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        for (index, values) in heads.into_iter().enumerate() {
            let id = session.targets[index].id.clone();
            let Some(head) = values.first().filter(|head| !head.is_empty()).cloned() else {
                return Err(PhaseError::EmptyHead { target: id });
            };
            note_disagreement(
                &mut session,
                self.ctx.remote.hosts(),
                &format!("{id} revision"),
                &values,
            );
            session.targets[index].old_head = Some(head);
        }
        Ok(session)
    }

    async fn pull(&self, session: &TransitionSession) -> Result<(), PhaseError> {
        self.ctx.output.section("Updating targets...");
        let pulls = session.targets.iter().map(|target| self.pull_target(target));
        let changes = join_all(pulls)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        for (target, changed) in session.targets.iter().zip(changes) {
            self.ctx
                .output
                .block(&format!("{} changed files:", target.label()), &changed);
        }
        Ok(())
    }

    async fn pull_target(&self, target: &UpdateTarget) -> Result<String, PhaseError> {
        let remote = self.ctx.remote;
        let dir = self.staged(target);

        remote
            .run(&shell::git_checkout_tip(&dir, &target.branch))
            .await?;
        remote
            .run(&RemoteCommand::new(self.settings.install_command.clone()).in_dir(dir.clone()))
            .await?;

        let Some(head) = &target.old_head else {
            return Ok(String::new());
        };
        let diff = remote.texts(&shell::git_changes_since(&dir, head)).await?;
        Ok(diff.into_iter().next().unwrap_or_default())
    }

    async fn scan_target(&self, target: &UpdateTarget) -> Result<MigrationReport, RemoteError> {
        let head = target.old_head.as_deref().unwrap_or("HEAD");
        let diff = self
            .ctx
            .remote
            .texts(&shell::git_changes_since(&self.staged(target), head))
            .await?;
        Ok(MigrationReport::from_diff(
            diff.first().map(String::as_str).unwrap_or_default(),
        ))
    }

    async fn check_migrations(&self, mut session: TransitionSession) -> TransitionSession {
        self.ctx.output.section("Checking the migrations...");
        let scans = session.targets.iter().map(|target| self.scan_target(target));
        let results = join_all(scans).await;

        let mut general = Vec::new();
        for (target, result) in session.targets.iter().zip(results) {
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    session.diagnostics.warn(Warning::detection(format!(
                        "{}: migration scan failed: {e}",
                        target.id
                    )));
                    continue;
                }
            };
            for scan in [&report.general, &report.flexible] {
                if scan.has_migrations {
                    self.ctx.output.progress(&format!(
                        "{}: {} found: {}",
                        target.id,
                        scan.kind,
                        scan.files.join(", ")
                    ));
                }
            }
            general.extend(
                report
                    .general
                    .files
                    .iter()
                    .map(|file| shell::join(&target.path, file)),
            );
            session.run_migrations |= report.has_migrations();
        }

        if !general.is_empty() {
            match fetch_reminders(self.ctx, &self.settings.app_path, &general).await {
                Ok(reminders) => session.reminders = reminders,
                Err(e) => session.diagnostics.warn(Warning::detection(e.to_string())),
            }
        }
        session
    }

    async fn confirm(&self, session: &TransitionSession) -> Result<bool, PhaseError> {
        self.ctx.output.section("Recent changes:");
        let reads = session
            .targets
            .iter()
            .map(|target| async move {
                let command = shell::git_recent(&self.staged(target));
                self.ctx.remote.texts(&command).await
            });
        let logs = join_all(reads).await;
        for (target, log) in session.targets.iter().zip(logs) {
            let log = log?;
            self.ctx
                .output
                .block(&target.label(), log.first().map(String::as_str).unwrap_or_default());
        }

        if session.run_migrations {
            self.ctx.output.warning("You should run the migrations!");
            for reminder in &session.reminders {
                self.ctx.output.progress(reminder);
            }
        }

        Ok(self
            .ctx
            .gate
            .confirm("Do you want to set this release as current (install it)?", true)
            .await)
    }

    async fn cut_over(&self) -> Result<(), PhaseError> {
        let layout = self.layout();
        self.ctx.output.section("Setting new release as current...");
        self.ctx
            .remote
            .run(&shell::move_dir(&layout.staging, &self.release_path))
            .await?;
        self.ctx
            .remote
            .relink(&self.release_path, &layout.current)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PhaseRunner for UpdateTransition<'_> {
    async fn run_phase(
        &self,
        phase: Phase,
        mut session: TransitionSession,
    ) -> Result<Step, PhaseError> {
        let ctx = self.ctx;
        let settings = self.settings;
        match phase {
            Phase::ResetPermissions => {
                if let Some(owner) = &settings.owner {
                    reset_permissions(
                        ctx,
                        settings.reset_dir_script.as_deref(),
                        Some(owner),
                        &settings.app_path,
                    )
                    .await?;
                }
            }
            Phase::Stage => self.stage().await?,
            Phase::SaveHead => session = self.save_heads(session).await?,
            Phase::Update => self.pull(&session).await?,
            Phase::MigrationCheck => session = self.check_migrations(session).await,
            Phase::Confirm => {
                if !self.confirm(&session).await? {
                    return Ok(Step::Halt(session, Outcome::Declined { phase }));
                }
            }
            Phase::SetLastWorked => {
                session = capture_last_worked(ctx, self.layout(), session).await?;
            }
            Phase::CutOver => {
                self.cut_over().await?;
                session.need_fallback = true;
            }
            Phase::Verify => {
                verify_current(ctx, self.layout(), &self.release_path).await?;
                ctx.output
                    .progress(&format!("{} is set as current", self.release_path));
            }
            Phase::ConfirmRestart => {
                if !confirm_restart(ctx).await {
                    return Ok(Step::Halt(session, Outcome::Declined { phase }));
                }
            }
            Phase::Restart => {
                let urls = unique_urls(session.targets.iter().map(|t| t.open_url.as_ref()));
                if let Some(outcome) = restart_hosts(ctx, &settings.restart, &urls).await? {
                    return Ok(Step::Halt(session, outcome));
                }
            }
            Phase::ShowStatus => show_status(ctx, &settings.restart).await?,
            Phase::Prune => {
                let summary = prune_releases(
                    ctx,
                    self.layout(),
                    settings.keep_releases,
                    &mut session.diagnostics,
                )
                .await;
                if !summary.protected.is_empty() {
                    ctx.output.progress(&format!(
                        "kept releases still in use: {}",
                        summary.protected.join(", ")
                    ));
                }
            }
            other => tracing::debug!(phase = %other, "not an update phase"),
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

/// Database commands for `files`, built from the app's `config.json`.
pub(crate) async fn fetch_reminders(
    ctx: TransitionContext<'_>,
    app_path: &str,
    files: &[String],
) -> Result<Vec<String>, DetectionError> {
    let contents = ctx
        .remote
        .texts(&shell::read_file(app_path, APP_CONFIG_FILE))
        .await
        .map_err(|e| DetectionError::ConfigUnavailable(e.to_string()))?;
    let config = contents.first().map(String::as_str).unwrap_or_default();
    database_reminders(config, files)
}
