// ABOUTME: SYNC transition: hard-reset live targets to their remote branch in place.
// ABOUTME: No staging or cutover; detectors and gates are the only safeguards.

use async_trait::async_trait;

use super::pipeline::{PhaseRunner, Step, drive};
use super::pointers::reset_permissions;
use super::restart::{RestartSettings, confirm_restart, restart_hosts, show_status, unique_urls};
use super::update::fetch_reminders;
use super::{
    Fallback, Outcome, Phase, PhaseError, Report, SYNC_FINISH_PHASES, SYNC_TARGET_PHASES,
    SyncFindings, TransitionContext, TransitionError, TransitionSession,
};
use crate::config::Config;
use crate::detect::{
    INDEX_DEFINITIONS_FILE, MANIFEST_FILE, MigrationReport, find_sample_config, has_changes,
    manifest_has_additions,
};
use crate::diagnostics::{Diagnostics, Warning};
use crate::remote::{RemoteCommand, RemoteError, shell};
use crate::targets::UpdateTarget;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub reset_dir_script: Option<String>,
    pub install_command: String,
    /// Skip the branch check and check the branch out before resetting.
    pub force: bool,
    pub restart: RestartSettings,
}

impl SyncSettings {
    pub fn from_config(config: &Config, force: bool) -> Self {
        Self {
            reset_dir_script: config.reset_dir_script.clone(),
            install_command: config.install_command.clone(),
            force,
            restart: RestartSettings::from_config(config),
        }
    }
}

/// `NODE_ENV` the migrate task runs under.
fn node_env(branch: &str) -> &'static str {
    if branch == "master" {
        "production"
    } else {
        "development"
    }
}

pub struct SyncTransition<'a> {
    ctx: TransitionContext<'a>,
    settings: &'a SyncSettings,
}

impl<'a> SyncTransition<'a> {
    pub fn new(ctx: TransitionContext<'a>, settings: &'a SyncSettings) -> Self {
        Self { ctx, settings }
    }

    /// Sync each target in order, then restart once.
    ///
    /// A decline on any target ends the whole run; targets already reset stay
    /// reset.
    pub async fn run(&self, targets: Vec<UpdateTarget>) -> Result<Report, TransitionError> {
        let mut session = TransitionSession::new(targets);
        for focus in 0..session.targets.len() {
            session.focus = focus;
            session.findings = SyncFindings::default();
            let report = drive(self, SYNC_TARGET_PHASES, session).await?;
            if report.outcome != Outcome::Completed {
                return Ok(report);
            }
            session = report.session;
        }
        drive(self, SYNC_FINISH_PHASES, session).await
    }

    async fn incoming(&self, command: &RemoteCommand) -> Result<String, RemoteError> {
        let texts = self.ctx.remote.texts(command).await?;
        Ok(texts.into_iter().next().unwrap_or_default())
    }

    async fn check_branch(&self, target: &UpdateTarget) -> Result<(), PhaseError> {
        if self.settings.force {
            self.ctx.output.progress("Skipping branch check");
            return Ok(());
        }
        let branches = self
            .ctx
            .remote
            .texts(&shell::git_current_branch(&target.path))
            .await?;
        for (host, found) in self.ctx.remote.hosts().iter().zip(branches) {
            if found != target.branch {
                return Err(PhaseError::BranchMismatch {
                    host: host.clone(),
                    found,
                    expected: target.branch.clone(),
                });
            }
        }
        Ok(())
    }

    async fn detect(&self, target: &UpdateTarget, diagnostics: &mut Diagnostics) -> SyncFindings {
        let path = &target.path;
        let branch = &target.branch;
        let mut findings = SyncFindings::default();
        self.ctx
            .output
            .section(&format!("Checking {} for changes...", target.id));

        match self.incoming(&shell::git_incoming_names(path, branch)).await {
            Ok(diff) => {
                let report = MigrationReport::from_diff(&diff);
                for scan in [&report.general, &report.flexible] {
                    if scan.has_migrations {
                        findings
                            .notes
                            .push(format!("New {} found: {}", scan.kind, scan.files.join(", ")));
                    }
                }
                if report.general.has_migrations {
                    let files: Vec<String> = report
                        .general
                        .files
                        .iter()
                        .map(|file| shell::join(path, file))
                        .collect();
                    match fetch_reminders(self.ctx, path, &files).await {
                        Ok(reminders) => findings.notes.extend(reminders),
                        Err(e) => diagnostics.warn(Warning::detection(e.to_string())),
                    }
                }
                findings.migrations = Some(report);
            }
            Err(e) => detection_failed(diagnostics, target, "migration", e),
        }

        match self
            .incoming(&shell::git_incoming_file(path, branch, MANIFEST_FILE))
            .await
        {
            Ok(diff) if manifest_has_additions(&diff) => {
                findings.manifest_changed = true;
                findings
                    .notes
                    .push(format!("New modules were found in {MANIFEST_FILE}"));
            }
            Ok(_) => {}
            Err(e) => detection_failed(diagnostics, target, "manifest", e),
        }

        match self.incoming(&shell::list_files(path)).await {
            Ok(listing) => {
                if let Some(sample) = find_sample_config(&listing) {
                    match self
                        .incoming(&shell::git_incoming_file(path, branch, &sample))
                        .await
                    {
                        Ok(diff) if has_changes(&diff) => {
                            findings
                                .notes
                                .push(format!("{sample} is changed, check your config"));
                            findings.sample_config = Some(sample);
                        }
                        Ok(_) => {}
                        Err(e) => detection_failed(diagnostics, target, "sample config", e),
                    }
                }
            }
            Err(e) => detection_failed(diagnostics, target, "sample config", e),
        }

        match self
            .incoming(&shell::git_incoming_file(path, branch, INDEX_DEFINITIONS_FILE))
            .await
        {
            Ok(diff) if has_changes(&diff) => {
                findings.indexes_changed = true;
                findings.notes.push(format!(
                    "{INDEX_DEFINITIONS_FILE} is changed, the search indexes may need a rebuild"
                ));
            }
            Ok(_) => {}
            Err(e) => detection_failed(diagnostics, target, "index definitions", e),
        }

        findings
    }

    async fn confirm(&self, target: &UpdateTarget, findings: &SyncFindings) -> Result<bool, PhaseError> {
        let incoming = self
            .incoming(&shell::git_incoming_status(&target.path, &target.branch))
            .await?;
        self.ctx
            .output
            .block(&format!("Incoming changes for {}:", target.label()), &incoming);
        for note in &findings.notes {
            self.ctx.output.warning(note);
        }
        Ok(self
            .ctx
            .gate
            .confirm(&format!("Do you want to update the {}?", target.id), true)
            .await)
    }

    async fn install(&self, target: &UpdateTarget, findings: &SyncFindings) -> Result<(), PhaseError> {
        let install = &self.settings.install_command;
        let question = format!("Do you want to run {install}?");
        if !self.ctx.gate.confirm(&question, findings.manifest_changed).await {
            return Ok(());
        }
        self.ctx.output.section(&format!("Running {install}..."));
        self.ctx
            .remote
            .run(&RemoteCommand::new(install.clone()).in_dir(target.path.clone()))
            .await?;
        Ok(())
    }

    async fn migrate(&self, target: &UpdateTarget, findings: &SyncFindings) -> Result<(), PhaseError> {
        let Some(task) = &target.migrate_task else {
            return Ok(());
        };
        if !findings.has_general_migrations() {
            return Ok(());
        }

        let command = format!("NODE_ENV={} {task}", node_env(&target.branch));
        self.ctx
            .output
            .warning(&format!("You should run the migrations: {command}"));
        if !self.ctx.gate.confirm("Do you want to run migrate task?", false).await {
            return Ok(());
        }
        self.ctx
            .remote
            .run_on(0, &RemoteCommand::new(command).in_dir(target.path.clone()))
            .await?;
        Ok(())
    }

    async fn run_target_phase(
        &self,
        phase: Phase,
        target: &UpdateTarget,
        mut session: TransitionSession,
    ) -> Result<Step, PhaseError> {
        let ctx = self.ctx;
        let path = &target.path;
        match phase {
            Phase::CheckBranch => self.check_branch(target).await?,
            Phase::ResetPermissions => {
                reset_permissions(
                    ctx,
                    self.settings.reset_dir_script.as_deref(),
                    target.owner.as_deref(),
                    path,
                )
                .await?;
            }
            Phase::Fetch => {
                ctx.output.section(&format!("Fetching {}...", target.label()));
                ctx.remote.run(&shell::git_fetch(path)).await?;
            }
            Phase::Detect => {
                let findings = self.detect(target, &mut session.diagnostics).await;
                session.run_migrations |= findings
                    .migrations
                    .as_ref()
                    .is_some_and(MigrationReport::has_migrations);
                session.findings = findings;
            }
            Phase::Confirm => {
                if !self.confirm(target, &session.findings).await? {
                    return Ok(Step::Halt(session, Outcome::Declined { phase }));
                }
            }
            Phase::HardReset => {
                ctx.output.section(&format!("Updating {}...", target.label()));
                if self.settings.force {
                    ctx.remote
                        .run(&shell::git_checkout(path, &target.branch))
                        .await?;
                }
                ctx.remote
                    .run(&shell::git_reset_to_origin(path, &target.branch))
                    .await?;
            }
            Phase::Install => self.install(target, &session.findings).await?,
            Phase::MigrateTask => self.migrate(target, &session.findings).await?,
            Phase::ShowResults => {
                let summary = self.incoming(&shell::git_reset_summary(path)).await?;
                ctx.output
                    .block(&format!("Results for {}:", target.label()), &summary);
            }
            other => tracing::debug!(phase = %other, "not a sync target phase"),
        }
        Ok(Step::Next(session))
    }
}

fn detection_failed(
    diagnostics: &mut Diagnostics,
    target: &UpdateTarget,
    what: &str,
    error: RemoteError,
) {
    diagnostics.warn(Warning::detection(format!(
        "{}: {what} check failed: {error}",
        target.id
    )));
}

#[async_trait]
impl PhaseRunner for SyncTransition<'_> {
    async fn run_phase(
        &self,
        phase: Phase,
        session: TransitionSession,
    ) -> Result<Step, PhaseError> {
        let ctx = self.ctx;
        match phase {
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
            Phase::ShowStatus => show_status(ctx, &self.settings.restart).await?,
            _ => {
                let Some(target) = session.focused().cloned() else {
                    return Ok(Step::Next(session));
                };
                return self.run_target_phase(phase, &target, session).await;
            }
        }
        Ok(Step::Next(session))
    }

    fn fallback(&self, _session: &TransitionSession) -> Option<Fallback> {
        None
    }
}
