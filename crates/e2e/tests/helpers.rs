//! Helper behavior against the in-process UI model


use std::time::Duration;

use test_case::test_case;

use plan_ui_e2e::helpers::{
    add_environment, apply_plan, await_startup, check_changes_and_backfills, check_environment_details,
    check_errors, check_file, check_model_change, go_back_to, go_to_plan, normalize_content, open_folders,
    select_environment, select_file, set_file_content_and_save, ApplyPlan, ChangesAndBackfills,
    EnvironmentDetails, ModelChange, Startup,
};
use plan_ui_e2e::locator::Locator;
use plan_ui_e2e::page::{Page, Timeouts};
use plan_ui_e2e::path::PathSeparator;
use plan_ui_e2e::plan::{PlanAction, PlanState};
use plan_ui_e2e::E2eError;

use support::{Event, FakeApp};

const INCREMENTAL: &str = "models/incremental_model.sql";

const EDITED: &str = "MODEL (name sqlmesh_example.incremental_model);\nSELECT 1 AS id\n";

fn position(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("event not found in {:#?}", events))
}

fn observed(title: &'static str) -> impl Fn(&Event) -> bool {
    move |event| {
        matches!(event, Event::Observed { locator, .. }
            if locator.starts_with("testid=editor >> testid=editor-tabs")
                && locator.ends_with(&format!("title=\"{}\"s", title)))
    }
}

fn response(url: &'static str, code: u16) -> impl Fn(&Event) -> bool {
    move |event| matches!(event, Event::Response { url: u, status } if u == url && *status == code)
}

async fn promote_prod(app: &FakeApp) {
    go_to_plan(app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();
    apply_plan(app, ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap();
    go_back_to(app, "/editor").await.unwrap();
}

#[tokio::test]
async fn test_startup_awaits_every_load_request() {
    let app = FakeApp::new();
    let startup = Startup {
        project_name: Some("basic".to_string()),
        ..Default::default()
    };

    await_startup(&app, &startup).await.unwrap();

    assert_eq!(app.route(), "/editor");
    let responses = app
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Response { .. }))
        .count();
    assert_eq!(responses, 7);
}

#[tokio::test]
async fn test_startup_rejects_failed_request() {
    let app = FakeApp::new().with_status("/api/models", 500);

    match await_startup(&app, &Startup::default()).await {
        Err(E2eError::UnexpectedStatus { url, expected, actual }) => {
            assert_eq!(url, "/api/models");
            assert_eq!((expected, actual), (200, 500));
        }
        other => panic!("expected a status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_startup_rejects_other_project() {
    let app = FakeApp::new();
    let startup = Startup {
        project_name: Some("sushi".to_string()),
        ..Default::default()
    };

    let err = await_startup(&app, &startup).await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)), "{}", err);
}

#[tokio::test]
async fn test_startup_requires_listed_modules() {
    let app = FakeApp::new();
    let startup = Startup {
        modules: vec!["editor".to_string(), "lineage".to_string()],
        ..Default::default()
    };

    let err = await_startup(&app, &startup).await.unwrap_err();
    assert!(err.to_string().contains("lineage"));
}

#[test_case(PathSeparator::Backslash ; "backslash titles")]
#[test_case(PathSeparator::Slash ; "slash titles")]
#[tokio::test]
async fn test_select_file_matches_api_content(separator: PathSeparator) {
    let app = FakeApp::on_editor().with_separator(separator);

    select_file(&app, INCREMENTAL, Some("sqlmesh_example.incremental_model"))
        .await
        .unwrap();

    let served = app.file(INCREMENTAL).unwrap();
    assert!(normalize_content(&served).contains(&"FROM sqlmesh_example.seed_model"));
}

#[tokio::test]
async fn test_select_file_detects_render_mismatch() {
    let app = FakeApp::on_editor().with_garbled_editor();

    match select_file(&app, INCREMENTAL, None).await {
        Err(E2eError::ContentMismatch { path }) => assert_eq!(path, INCREMENTAL),
        other => panic!("expected a content mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_select_file_rejects_failed_read() {
    let app = FakeApp::on_editor().with_status("/api/files/models/incremental_model.sql", 404);

    let err = select_file(&app, INCREMENTAL, None).await.unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedStatus { actual: 404, .. }));
}

#[test_case(PathSeparator::Backslash ; "backslash titles")]
#[test_case(PathSeparator::Slash ; "slash titles")]
#[tokio::test]
async fn test_check_file_at_root_and_nested(separator: PathSeparator) {
    let app = FakeApp::on_editor().with_separator(separator);

    check_file(&app, "config.yaml").await.unwrap();
    check_file(&app, "models/full_model.sql").await.unwrap();
}

#[tokio::test]
async fn test_check_file_missing_entry_fails_the_wait() {
    let app = FakeApp::on_editor();

    let err = check_file(&app, "models/missing_model.sql").await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_missing_folder_fails_the_wait() {
    let app = FakeApp::on_editor();

    let err = open_folders(&app, &["seeds".to_string()]).await.unwrap_err();
    assert!(err.is_timeout());
}

/// A response that arrives before its waiter exists is never seen
#[tokio::test]
async fn test_waiter_registered_after_action_misses_response() {
    let app = FakeApp::on_editor();
    open_folders(&app, &["models".to_string()]).await.unwrap();

    let file = Locator::test_id("file-explorer").get_by_title_exact("models\\full_model.sql");
    app.click(&file).await.unwrap();

    let late = app.expect_response("/api/files/models/full_model.sql").await.unwrap();
    let err = app.await_response(late).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_save_walks_indicators_in_order() {
    let app = FakeApp::on_editor();
    select_file(&app, INCREMENTAL, None).await.unwrap();

    set_file_content_and_save(&app, INCREMENTAL, EDITED).await.unwrap();

    let events = app.events();
    let unsaved = position(&events, observed("unsaved"));
    let press = position(&events, |e| matches!(e, Event::Action(a) if a == "press Control+S"));
    let file_saved = position(&events, response("/api/files/models/incremental_model.sql", 204));
    let plan_updated = position(&events, response("/api/plan", 204));
    let saved_again = events
        .iter()
        .rposition(observed("saved"))
        .unwrap();

    assert!(unsaved < press);
    assert!(press < file_saved);
    assert!(file_saved < plan_updated);
    assert!(plan_updated < saved_again);
    assert_eq!(app.file(INCREMENTAL).as_deref(), Some(EDITED));
}

#[tokio::test]
async fn test_save_rejects_failed_plan_refresh() {
    let app = FakeApp::on_editor().with_status("/api/plan", 500);
    select_file(&app, INCREMENTAL, None).await.unwrap();

    let err = set_file_content_and_save(&app, INCREMENTAL, EDITED).await.unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedStatus { expected: 204, actual: 500, .. }));
}

#[tokio::test]
async fn test_selector_disabled_until_first_promotion() {
    let app = FakeApp::on_editor();
    let locked = EnvironmentDetails {
        env: "prod",
        action_disabled: Some(false),
        selector_disabled: Some(true),
    };
    check_environment_details(&app, &locked).await.unwrap();

    promote_prod(&app).await;

    let err = check_environment_details(&app, &locked).await.unwrap_err();
    assert!(err.is_timeout());
    check_environment_details(
        &app,
        &EnvironmentDetails {
            selector_disabled: Some(false),
            ..EnvironmentDetails::new("prod")
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_add_and_select_environments() {
    let app = FakeApp::on_editor();
    promote_prod(&app).await;

    add_environment(&app, "dev").await.unwrap();
    assert_eq!(app.environments(), vec!["prod", "dev"]);
    assert_eq!(app.selected_environment(), "dev");
    check_environment_details(&app, &EnvironmentDetails::new("dev")).await.unwrap();

    select_environment(&app, "prod").await.unwrap();
    assert_eq!(app.selected_environment(), "prod");
}

#[tokio::test]
async fn test_select_unknown_environment_fails() {
    let app = FakeApp::on_editor();
    promote_prod(&app).await;

    let err = select_environment(&app, "staging").await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_counters_track_promotion() {
    let app = FakeApp::on_editor();
    check_changes_and_backfills(
        &app,
        ChangesAndBackfills {
            added: Some(3),
            backfills: Some(3),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = check_changes_and_backfills(&app, ChangesAndBackfills::backfills(0))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    promote_prod(&app).await;
    check_changes_and_backfills(&app, ChangesAndBackfills::backfills(0)).await.unwrap();
    check_errors(&app, "No Errors").await.unwrap();
}

#[tokio::test]
async fn test_go_to_plan_expects_action_label() {
    let app = FakeApp::on_editor();

    let err = go_to_plan(&app, "prod", PlanAction::ApplyVirtualUpdate).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_apply_plan_rejects_non_apply_action() {
    let app = FakeApp::on_editor();
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    let err = apply_plan(&app, ApplyPlan::new("prod", PlanAction::StartOver))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)));
}

/// Completion of a backfill is only visible within the extended timeout
#[tokio::test]
async fn test_backfill_needs_extended_timeout() {
    let short = Timeouts {
        default: Duration::from_secs(5),
        extended: Duration::from_secs(5),
    };
    let app = FakeApp::on_editor().with_timeouts(short);
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    let err = apply_plan(&app, ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{}", err);

    let app = FakeApp::on_editor();
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();
    let state = apply_plan(&app, ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap();
    assert_eq!(state, PlanState::Completed);
}

#[tokio::test]
async fn test_expected_confirmation_is_accepted() {
    let app = FakeApp::on_editor().confirming_everything();
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    apply_plan(
        &app,
        ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill).confirmed(),
    )
    .await
    .unwrap();

    assert!(app.plan_snapshots().iter().any(|c| c.confirmation));
}

#[tokio::test]
async fn test_unexpected_confirmation_is_a_wrong_value() {
    let app = FakeApp::on_editor().confirming_everything();
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    let err = apply_plan(&app, ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(ref m) if m.contains("confirmation")), "{}", err);
}

#[tokio::test]
async fn test_confirmation_check_keeps_bridge_errors() {
    let app = FakeApp::on_editor().with_broken_bridge_in("modal-confirmation");
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    let err = apply_plan(&app, ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::Bridge(ref m) if m.contains("modal-confirmation")), "{}", err);
}

#[tokio::test]
async fn test_missing_confirmation_fails_the_wait() {
    let app = FakeApp::on_editor();
    go_to_plan(&app, "prod", PlanAction::ApplyChangesAndBackfill).await.unwrap();

    let err = apply_plan(
        &app,
        ApplyPlan::new("prod", PlanAction::ApplyChangesAndBackfill).confirmed(),
    )
    .await
    .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_every_plan_snapshot_names_one_state() {
    let app = FakeApp::on_editor();
    promote_prod(&app).await;
    set_up_dev_edit(&app).await;
    apply_plan(&app, ApplyPlan::new("dev", PlanAction::ApplyChangesAndBackfill))
        .await
        .unwrap();

    let snapshots = app.plan_snapshots();
    assert!(!snapshots.is_empty());
    for controls in snapshots {
        let state = PlanState::observe(&controls).unwrap();
        assert!(controls.satisfies(state), "{:?} vs {}", controls, state);
        let shown = [controls.primary, controls.cancel, controls.go_back]
            .iter()
            .filter(|v| **v)
            .count();
        assert_eq!(shown, 1, "{:?}", controls);
    }
}

async fn set_up_dev_edit(app: &FakeApp) {
    add_environment(app, "dev").await.unwrap();
    select_file(app, INCREMENTAL, None).await.unwrap();
    set_file_content_and_save(app, INCREMENTAL, EDITED).await.unwrap();
    go_to_plan(app, "dev", PlanAction::ApplyChangesAndBackfill).await.unwrap();
}

#[tokio::test]
async fn test_stage_tracker_names_changed_model() {
    let app = FakeApp::on_editor();
    promote_prod(&app).await;
    set_up_dev_edit(&app).await;

    check_model_change(
        &app,
        ModelChange {
            group: "Modified Directly",
            model: "sqlmesh_example__dev.incremental_model",
            change: "Breaking Change",
        },
    )
    .await
    .unwrap();

    let err = check_model_change(
        &app,
        ModelChange {
            group: "Modified Directly",
            model: "sqlmesh_example__dev.full_model",
            change: "Breaking Change",
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_edit_counts_direct_and_indirect_changes() {
    let app = FakeApp::on_editor();
    promote_prod(&app).await;
    select_file(&app, INCREMENTAL, None).await.unwrap();
    set_file_content_and_save(&app, INCREMENTAL, EDITED).await.unwrap();

    let summary = app.summary("prod");
    assert_eq!((summary.direct, summary.indirect, summary.backfills), (1, 1, 2));
    check_changes_and_backfills(
        &app,
        ChangesAndBackfills {
            direct: Some(1),
            indirect: Some(1),
            backfills: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}
