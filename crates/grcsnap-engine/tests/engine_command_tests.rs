//! Command dispatch, dry-run, hooks, rollback and logging

mod common;

use common::{
    audit, audit_controls_rules, control, count, options, relate, revise, setup, FailingAcl,
    RecordingHooks,
};
use grcsnap_core::core_types::schema::{EVENT_END, EVENT_END_ERROR};
use grcsnap_core::errors::ExErrorKind;
use grcsnap_core::logging_facility::test_capture::init_test_capture;
use grcsnap_core::model::{Pair, RevisionAction};
use grcsnap_core::response::RevisionMap;
use grcsnap_engine::commands::engine_command::{
    apply_engine_command, EngineCommand, EngineCommandResult,
};
use grcsnap_engine::commands::snapshot::{create_snapshots, upsert_snapshots, Hooks};
use grcsnap_store::objects::upsert_object;
use grcsnap_store::snapshot::{list_parent_links, list_snapshots};
use std::collections::BTreeSet;

#[test]
fn test_dry_run_reports_without_writing() {
    let mut conn = setup();
    let a = audit(1);
    relate(&conn, &a, &control(1));
    let revision_id = revise(&conn, &control(1), RevisionAction::Created);
    let relationships = count(&conn, "relationships");

    let response = upsert_snapshots(
        &mut conn,
        &audit_controls_rules(),
        &[a.clone()],
        &RevisionMap::new(),
        None,
        &options().with_dry_run(true),
        Hooks::default(),
    )
    .unwrap();

    let pair = Pair::new(a, control(1));
    assert!(response.extra.dry_run);
    assert!(response.extra.mirror.is_none());
    assert_eq!(response.response.create, BTreeSet::from([pair.clone()]));
    assert_eq!(response.extra.revisions.get(&pair), Some(&revision_id));
    assert_eq!(count(&conn, "snapshots"), 0);
    assert_eq!(count(&conn, "events"), 0);
    assert_eq!(count(&conn, "relationships"), relationships);
}

#[test]
fn test_explicit_revision_overrides_latest() {
    let mut conn = setup();
    let a = audit(1);
    relate(&conn, &a, &control(1));
    let pinned = revise(&conn, &control(1), RevisionAction::Created);
    revise(&conn, &control(1), RevisionAction::Modified);
    let pair = Pair::new(a.clone(), control(1));

    create_snapshots(
        &mut conn,
        &audit_controls_rules(),
        &[a.clone()],
        &RevisionMap::from([(pair, pinned)]),
        None,
        &options(),
        Hooks::default(),
    )
    .unwrap();

    assert_eq!(list_snapshots(&conn, &a).unwrap()[0].revision_id, pinned);
}

#[test]
fn test_snapshots_inherit_parent_context() {
    let mut conn = setup();
    let a = audit(1);
    upsert_object(&conn, &a, Some(5)).unwrap();
    relate(&conn, &a, &control(1));
    revise(&conn, &control(1), RevisionAction::Created);

    create_snapshots(&mut conn, &audit_controls_rules(), &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
        .unwrap();

    assert_eq!(list_snapshots(&conn, &a).unwrap()[0].context_id, Some(5));
}

#[test]
fn test_hooks_receive_new_links_and_touched_pairs() {
    let mut conn = setup();
    let a = audit(1);
    for id in [1, 2] {
        relate(&conn, &a, &control(id));
        revise(&conn, &control(id), RevisionAction::Created);
    }
    let hooks = RecordingHooks::default();
    let wired = Hooks::default().with_reindex(&hooks).with_acl(&hooks);

    for _ in 0..2 {
        upsert_snapshots(&mut conn, &audit_controls_rules(), &[a.clone()], &RevisionMap::new(), None, &options(), wired)
            .unwrap();
    }

    let acl_batches = hooks.acl_batches.borrow();
    assert_eq!(acl_batches.len(), 1);
    let link_ids: Vec<i64> = list_parent_links(&conn, &a).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(acl_batches[0], link_ids);

    let reindexed = hooks.reindexed.borrow();
    assert_eq!(reindexed.len(), 1);
    assert_eq!(reindexed[0].len(), 2);
}

#[test]
fn test_failing_collaborator_rolls_back_everything() {
    let mut conn = setup();
    let a = audit(1);
    relate(&conn, &a, &control(1));
    revise(&conn, &control(1), RevisionAction::Created);
    let revisions = count(&conn, "revisions");

    let err = upsert_snapshots(
        &mut conn,
        &audit_controls_rules(),
        &[a],
        &RevisionMap::new(),
        None,
        &options(),
        Hooks::default().with_acl(&FailingAcl),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::ExternalService);
    assert!(err.request_id().is_some());
    assert_eq!(count(&conn, "snapshots"), 0);
    assert_eq!(count(&conn, "events"), 0);
    assert_eq!(count(&conn, "revisions"), revisions);
}

#[test]
fn test_focus_restricts_the_pass() {
    let mut conn = setup();
    let a = audit(1);
    for id in [1, 2] {
        relate(&conn, &a, &control(id));
        revise(&conn, &control(id), RevisionAction::Created);
    }

    let result = apply_engine_command(
        EngineCommand::UpsertSnapshots {
            parents: vec![a.clone()],
            revisions: RevisionMap::new(),
            focus: Some(control(2)),
            options: options(),
        },
        &mut conn,
        &audit_controls_rules(),
        Hooks::default(),
    )
    .unwrap();

    let EngineCommandResult::Upserted(response) = result else {
        panic!("expected an upsert result");
    };
    assert_eq!(
        response.response.create,
        BTreeSet::from([Pair::new(a.clone(), control(2))])
    );
    assert_eq!(list_snapshots(&conn, &a).unwrap().len(), 1);
}

#[test]
fn test_command_result_serializes_envelope() {
    let mut conn = setup();
    let a = audit(1);
    relate(&conn, &a, &control(1));
    revise(&conn, &control(1), RevisionAction::Created);

    let result = apply_engine_command(
        EngineCommand::CreateSnapshots {
            parents: vec![a],
            revisions: RevisionMap::new(),
            focus: None,
            options: options(),
        },
        &mut conn,
        &audit_controls_rules(),
        Hooks::default(),
    )
    .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["operation"], "create");
    assert_eq!(json["success"], true);
    assert_eq!(json["response"][0]["child"]["id"], 1);
    assert_eq!(json["extra"]["mirror"]["parent_links"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_missing_revision_is_logged_not_raised() {
    let capture = init_test_capture();
    let mut conn = setup();
    let a = audit(31);
    relate(&conn, &a, &control(31));

    let response = create_snapshots(
        &mut conn,
        &audit_controls_rules(),
        &[a.clone()],
        &RevisionMap::new(),
        None,
        &options(),
        Hooks::default(),
    )
    .unwrap();

    assert_eq!(response.extra.missed.len(), 1);
    assert!(response.response.is_empty());
    let warnings = capture.count_events(|e| {
        e.level == tracing::Level::WARN && e.fields.get("child").map(String::as_str) == Some("Control:31")
    });
    assert!(warnings >= 1);
    capture.assert_event_exists("create_snapshots", EVENT_END);
}

#[test]
fn test_failed_command_logs_end_error() {
    let capture = init_test_capture();
    let mut conn = setup();

    let result = apply_engine_command(
        EngineCommand::RefreshSnapshot {
            snapshot_id: 9001,
            options: options(),
        },
        &mut conn,
        &audit_controls_rules(),
        Hooks::default(),
    );

    assert!(result.is_err());
    capture.assert_event_exists("refresh_snapshot", EVENT_END_ERROR);
}
