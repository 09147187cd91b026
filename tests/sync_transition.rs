// ABOUTME: Integration tests for the sync transition against an in-memory fleet.
// ABOUTME: Covers the branch check, per-target gates, detectors, and the migrate task.

mod support;

use relink::diagnostics::WarningKind;
use relink::targets::UpdateTarget;
use relink::transition::{
    Outcome, Phase, RestartSettings, SyncSettings, SyncTransition, TransitionErrorKind,
};
use std::time::Duration;
use support::{FakeFleet, RecordingOpener, ScriptedGate, context, init_tracing, quiet};

fn live(id: &str) -> UpdateTarget {
    UpdateTarget {
        id: id.to_string(),
        path: format!("/srv/www/{id}"),
        branch: "master".to_string(),
        owner: None,
        description: None,
        migrate_task: None,
        open_url: None,
        parent: None,
        old_head: None,
    }
}

fn settings(force: bool) -> SyncSettings {
    SyncSettings {
        reset_dir_script: None,
        install_command: "npm install".to_string(),
        force,
        restart: RestartSettings {
            restart_script: Some("sudo systemctl restart app".to_string()),
            show_status_script: None,
            status_delay: Duration::ZERO,
        },
    }
}

fn fleet() -> FakeFleet {
    init_tracing();
    let fleet = FakeFleet::new(&["app1", "app2"]);
    fleet.respond("git rev-parse --abbrev-ref HEAD", "master");
    fleet.respond("git diff --name-status ..origin/master", "M\tlib/app.js");
    fleet
}

#[tokio::test]
async fn sync_resets_each_target_and_restarts_once() {
    let fleet = fleet();
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("api"), live("web")])
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert!(!report.pointers_changed());
    assert!(fleet.ran("cd /srv/www/api && git fetch"));
    assert!(fleet.ran("cd /srv/www/api && git reset --hard origin/master"));
    assert!(fleet.ran("cd /srv/www/web && git reset --hard origin/master"));
    assert_eq!(fleet.count("systemctl restart"), 2);
    assert!(!fleet.ran("git checkout"));
    assert!(!fleet.ran("ln -nfs"));
}

#[tokio::test]
async fn wrong_branch_stops_before_any_reset() {
    let fleet = fleet();
    fleet.respond_on(1, "--abbrev-ref", "develop");
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let err = SyncTransition::new(ctx, &settings)
        .run(vec![live("api")])
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Phase::CheckBranch);
    assert_eq!(err.kind(), TransitionErrorKind::Preflight);
    assert!(
        err.to_string()
            .contains("app2: current branch is develop, expected master")
    );
    assert!(!fleet.ran("git reset --hard"));
}

#[tokio::test]
async fn force_checks_the_branch_out_instead() {
    let fleet = fleet();
    fleet.respond("--abbrev-ref", "develop");
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(true);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("api")])
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert!(!fleet.ran("--abbrev-ref"));
    assert!(fleet.ran("cd /srv/www/api && git checkout master"));
    assert!(fleet.ran("cd /srv/www/api && git reset --hard origin/master"));
}

#[tokio::test]
async fn declining_a_target_ends_the_run() {
    let fleet = fleet();
    let gate = ScriptedGate::yes().answer("update the web", false);
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("api"), live("web"), live("admin")])
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        Outcome::Declined {
            phase: Phase::Confirm
        }
    );
    assert!(fleet.ran("cd /srv/www/api && git reset --hard"));
    assert!(!fleet.ran("cd /srv/www/web && git reset --hard"));
    assert!(!fleet.ran("/srv/www/admin"));
    assert!(!gate.was_asked("restart"));
}

#[tokio::test]
async fn defaults_skip_install_and_migrations() {
    let fleet = fleet();
    fleet.respond("git diff --name-only origin/master", "migrations/004_tags.sql");
    let gate = ScriptedGate::defaults();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);
    let mut api = live("api");
    api.migrate_task = Some("npm run migrate".to_string());

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![api])
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert!(report.session.run_migrations);
    assert!(gate.was_asked("Do you want to run npm install?"));
    assert!(gate.was_asked("Do you want to run migrate task?"));
    assert!(!fleet.ran("&& npm install"));
    assert!(!fleet.ran("npm run migrate"));
}

#[tokio::test]
async fn migrate_task_runs_on_the_first_host_only() {
    let fleet = fleet();
    fleet.respond("git diff --name-only origin/master", "migrations/004_tags.sql");
    fleet.respond(
        "cat ./config.json",
        r#"{"mysql":{"host":"db1","user":"app","password":"pw","database":"shop"}}"#,
    );
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);
    let mut api = live("api");
    api.migrate_task = Some("npm run migrate".to_string());

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![api])
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    let migrations: Vec<_> = fleet
        .commands()
        .into_iter()
        .filter(|(_, command)| command.contains("NODE_ENV=production npm run migrate"))
        .collect();
    assert_eq!(migrations.len(), 1);
    assert_eq!(migrations[0].0, "app1");
    assert!(
        report
            .session
            .findings
            .notes
            .iter()
            .any(|note| note.ends_with("< /srv/www/api/migrations/004_tags.sql"))
    );
}

#[tokio::test]
async fn reminders_use_each_targets_own_config() {
    let fleet = fleet();
    fleet.respond("git diff --name-only origin/master", "migrations/004_tags.sql");
    fleet.respond(
        "cd /srv/www/api && cat ./config.json",
        r#"{"mysql":{"host":"db-api","user":"api","password":"a","database":"api"}}"#,
    );
    fleet.respond(
        "cd /srv/www/web && cat ./config.json",
        r#"{"mysql":{"host":"db-web","user":"web","password":"w","database":"web"}}"#,
    );
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("web")])
        .await
        .unwrap();

    assert!(fleet.ran("cd /srv/www/web && cat ./config.json"));
    assert!(!fleet.ran("cd /srv/www/api && cat ./config.json"));
    let reminder = "mysql -hdb-web -uweb -p'w' web < /srv/www/web/migrations/004_tags.sql";
    assert!(report.session.findings.notes.iter().any(|note| note == reminder));
}

#[tokio::test]
async fn manifest_additions_default_install_to_yes() {
    let fleet = fleet();
    fleet.respond("-- package.json", "+    \"left-pad\": \"^1.3.0\",");
    let gate = ScriptedGate::defaults();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("api")])
        .await
        .unwrap();

    assert!(report.session.findings.manifest_changed);
    assert!(fleet.ran("cd /srv/www/api && npm install"));
}

#[tokio::test]
async fn failed_detector_is_a_warning() {
    let fleet = fleet();
    fleet.fail_on("-- indexes.js");
    fleet.respond("&& ls", "README.md\nconfig.json.sample\n");
    fleet.respond("-- config.json.sample", "+  \"cache\": true");
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let settings = settings(false);

    let ctx = context(&fleet, &gate, &opener, &output);
    let report = SyncTransition::new(ctx, &settings)
        .run(vec![live("api")])
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert!(report.diagnostics().has(WarningKind::Detection));
    assert_eq!(
        report.session.findings.sample_config.as_deref(),
        Some("config.json.sample")
    );
}
