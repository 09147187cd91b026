// ABOUTME: Integration tests for resolving targets from config and remote listings.
// ABOUTME: Covers recursive expansion, selection by name, and interactive selection.

mod support;

use relink::diagnostics::{Diagnostics, WarningKind};
use relink::targets::TargetSpec;
use relink::transition::resolve_targets;
use support::{FakeFleet, RecordingOpener, ScriptedGate, context, init_tracing, quiet};

fn configured() -> Vec<TargetSpec> {
    let mut core = TargetSpec::new("core", ".");
    core.branch = Some("master".to_string());
    core.description = Some("Application core".to_string());
    let mut modules = TargetSpec::new("modules", "modules");
    modules.branch = Some("master".to_string());
    modules.recursive = true;
    vec![core, modules]
}

fn fleet() -> FakeFleet {
    init_tracing();
    let fleet = FakeFleet::new(&["app1", "app2"]);
    fleet.add_dir("/srv/releases/release-01.01.2024-1000/modules/billing");
    fleet.add_dir("/srv/releases/release-01.01.2024-1000/modules/search");
    fleet.set_link("/srv/app", "/srv/releases/release-01.01.2024-1000");
    fleet
}

fn names(requested: &[&str]) -> Vec<String> {
    requested.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn recursive_children_are_listed_through_the_current_link() {
    let fleet = fleet();
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let mut diag = Diagnostics::default();

    let ctx = context(&fleet, &gate, &opener, &output);
    let targets = resolve_targets(ctx, &configured(), "/srv/app", &[], &mut diag)
        .await
        .unwrap();

    let ids: Vec<_> = targets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["core", "modules/billing", "modules/search"]);
    assert_eq!(targets[2].path, "modules/search");
    assert!(gate.was_asked("Include core [.] (Application core)?"));
    assert!(!diag.has_warnings());
}

#[tokio::test]
async fn parent_name_selects_all_children() {
    let fleet = fleet();
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let mut diag = Diagnostics::default();

    let ctx = context(&fleet, &gate, &opener, &output);
    let targets = resolve_targets(
        ctx,
        &configured(),
        "/srv/app",
        &names(&["modules"]),
        &mut diag,
    )
    .await
    .unwrap();

    assert_eq!(targets.len(), 2);
    assert!(targets.iter().all(|t| t.parent.as_deref() == Some("modules")));
    assert!(gate.asked().is_empty());
}

#[tokio::test]
async fn unknown_name_is_rejected() {
    let fleet = fleet();
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let mut diag = Diagnostics::default();

    let ctx = context(&fleet, &gate, &opener, &output);
    let err = resolve_targets(
        ctx,
        &configured(),
        "/srv/app",
        &names(&["core payments"]),
        &mut diag,
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "unknown target: payments");
}

#[tokio::test]
async fn declining_every_target_is_an_error() {
    let fleet = fleet();
    let gate = ScriptedGate::yes().answer("Include", false);
    let opener = RecordingOpener::default();
    let output = quiet();
    let mut diag = Diagnostics::default();

    let ctx = context(&fleet, &gate, &opener, &output);
    let err = resolve_targets(ctx, &configured(), "/srv/app", &[], &mut diag)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("at least one target"));
}

#[tokio::test]
async fn hosts_with_different_children_are_reported() {
    let fleet = fleet();
    fleet.add_dir_on(0, "/srv/releases/release-01.01.2024-1000/modules/reports");
    let gate = ScriptedGate::yes();
    let opener = RecordingOpener::default();
    let output = quiet();
    let mut diag = Diagnostics::default();

    let ctx = context(&fleet, &gate, &opener, &output);
    let targets = resolve_targets(
        ctx,
        &configured(),
        "/srv/app",
        &names(&["modules"]),
        &mut diag,
    )
    .await
    .unwrap();

    assert_eq!(targets.len(), 3);
    assert!(diag.has(WarningKind::UnsyncedHosts));
}
