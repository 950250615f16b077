//! End-to-end properties of create/upsert against a migrated database

mod common;

use common::{
    audit, audit_controls_rules, control, count, fingerprint, options, relate, revise, setup,
    USER_ID,
};
use grcsnap_core::model::{Pair, RevisionAction, Stub, SNAPSHOT_TYPE};
use grcsnap_core::response::RevisionMap;
use grcsnap_core::rules::{NeighborRule, RuleTable, ScopingRule};
use grcsnap_engine::commands::snapshot::{create_snapshots, upsert_snapshots, Hooks};
use grcsnap_engine::SnapshotGenerator;
use grcsnap_store::objects::{set_attribute, SqliteObjectDirectory};
use grcsnap_store::relationships::delete_relationship;
use grcsnap_store::revision::fetch_revision;
use grcsnap_store::snapshot::{list_snapshot_relationships, list_snapshots};
use std::collections::BTreeSet;

#[test]
fn test_single_control_is_snapshotted_at_latest_live_revision() {
    let mut conn = setup();
    let a = audit(1);
    let c1 = control(1);
    relate(&conn, &a, &c1);
    revise(&conn, &c1, RevisionAction::Created);
    let latest = revise(&conn, &c1, RevisionAction::Modified);

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

    let pair = Pair::new(a.clone(), c1.clone());
    assert!(response.success);
    assert_eq!(response.response, BTreeSet::from([pair.clone()]));
    assert_eq!(response.extra.revisions.get(&pair), Some(&latest));

    let snapshots = list_snapshots(&conn, &a).unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].child(), c1);
    assert_eq!(snapshots[0].revision_id, latest);
    assert_eq!(snapshots[0].modified_by_id, USER_ID);
}

#[test]
fn test_related_controls_get_one_snapshot_relationship() {
    let mut conn = setup();
    let a = audit(1);
    let (c1, c2) = (control(1), control(2));
    relate(&conn, &a, &c1);
    relate(&conn, &a, &c2);
    relate(&conn, &c1, &c2);
    revise(&conn, &c1, RevisionAction::Created);
    revise(&conn, &c2, RevisionAction::Created);

    upsert_snapshots(
        &mut conn,
        &audit_controls_rules(),
        &[a.clone()],
        &RevisionMap::new(),
        None,
        &options(),
        Hooks::default(),
    )
    .unwrap();

    let snapshot_ids: BTreeSet<i64> = list_snapshots(&conn, &a)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    let mirrored = list_snapshot_relationships(&conn, &a).unwrap();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].source.object_type, SNAPSHOT_TYPE);
    assert_eq!(mirrored[0].destination.object_type, SNAPSHOT_TYPE);
    let endpoints = BTreeSet::from([mirrored[0].source.id, mirrored[0].destination.id]);
    assert_eq!(endpoints, snapshot_ids);
}

#[test]
fn test_second_upsert_mutates_nothing() {
    let mut conn = setup();
    let rules = audit_controls_rules();
    let parents = [audit(1), audit(2)];
    for id in 1..=4 {
        let c = control(id);
        revise(&conn, &c, RevisionAction::Created);
        relate(&conn, &parents[(id % 2) as usize], &c);
    }
    relate(&conn, &control(1), &control(3));

    upsert_snapshots(&mut conn, &rules, &parents, &RevisionMap::new(), None, &options(), Hooks::default())
        .unwrap();
    let before = fingerprint(&conn);

    let second = upsert_snapshots(
        &mut conn,
        &rules,
        &parents,
        &RevisionMap::new(),
        None,
        &options(),
        Hooks::default(),
    )
    .unwrap();

    assert!(second.response.is_empty());
    assert!(second.extra.mirror.as_ref().is_some_and(|m| m.is_noop()));
    assert_eq!(fingerprint(&conn), before);
}

#[test]
fn test_at_most_one_snapshot_per_pair() {
    let mut conn = setup();
    let rules = audit_controls_rules();
    let a = audit(1);
    for id in 1..=3 {
        relate(&conn, &a, &control(id));
        revise(&conn, &control(id), RevisionAction::Created);
    }

    for _ in 0..2 {
        create_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
            .unwrap();
        upsert_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
            .unwrap();
    }

    let duplicates: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM (SELECT 1 FROM snapshots
             GROUP BY parent_type, parent_id, child_type, child_id HAVING COUNT(*) > 1)",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(duplicates, 0);
    assert_eq!(count(&conn, "snapshots"), 3);
}

#[test]
fn test_snapshots_never_point_at_deleted_revisions() {
    let mut conn = setup();
    let rules = audit_controls_rules();
    let a = audit(1);
    let (c1, c2) = (control(1), control(2));
    relate(&conn, &a, &c1);
    relate(&conn, &a, &c2);
    revise(&conn, &c1, RevisionAction::Created);
    revise(&conn, &c2, RevisionAction::Deleted);

    let created =
        create_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
            .unwrap();
    assert_eq!(
        created.extra.missed,
        BTreeSet::from([Pair::new(a.clone(), c2.clone())])
    );

    let modified = revise(&conn, &c1, RevisionAction::Modified);
    revise(&conn, &c1, RevisionAction::Deleted);
    let upserted =
        upsert_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
            .unwrap();
    assert_eq!(upserted.response.update.len(), 1);

    for snapshot in list_snapshots(&conn, &a).unwrap() {
        let revision = fetch_revision(&conn, snapshot.revision_id).unwrap();
        assert_eq!(revision.resource(), snapshot.child());
        assert!(revision.action.is_snapshottable());
        assert_eq!(snapshot.revision_id, modified);
    }
}

#[test]
fn test_scope_is_first_order_plus_one_hop() {
    let conn = setup();
    let a = audit(1);
    let program = Stub::new("Program", 1);
    let c1 = control(1);
    let objective = Stub::new("Objective", 1);
    set_attribute(&conn, &a, "program", &program).unwrap();
    relate(&conn, &program, &c1);
    relate(&conn, &objective, &program);
    relate(&conn, &program, &Stub::new("Risk", 1));
    // Reachable only through a second-order object
    relate(&conn, &c1, &Stub::new("Market", 1));

    let rules = RuleTable::new()
        .with_rule("Audit", ScopingRule::first_order([NeighborRule::attribute("program")]))
        .with_rule("Program", ScopingRule::second_order(["Control", "Objective"]))
        .with_rule("Control", ScopingRule::second_order(["Market"]));
    let objects = SqliteObjectDirectory::new(&conn);
    let mut generator = SnapshotGenerator::new(&conn, &rules, &objects, USER_ID);

    let scope = generator.add_parent(&a).unwrap().clone();
    assert_eq!(scope, BTreeSet::from([program, c1, objective]));

    let diff = generator.analyze().unwrap();
    assert_eq!(diff.new.len(), 3);
    assert!(diff.keep.is_empty() && diff.stale.is_empty());
}

#[test]
fn test_unrelating_children_prunes_snapshot_relationship() {
    let mut conn = setup();
    let rules = audit_controls_rules();
    let a = audit(1);
    let (c1, c2) = (control(1), control(2));
    relate(&conn, &a, &c1);
    relate(&conn, &a, &c2);
    relate(&conn, &c2, &c1);
    revise(&conn, &c1, RevisionAction::Created);
    revise(&conn, &c2, RevisionAction::Created);
    upsert_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
        .unwrap();
    assert_eq!(list_snapshot_relationships(&conn, &a).unwrap().len(), 1);

    delete_relationship(&conn, &c1, &c2).unwrap();
    let response =
        upsert_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
            .unwrap();

    assert_eq!(response.extra.mirror.map(|m| m.pruned), Some(1));
    assert!(list_snapshot_relationships(&conn, &a).unwrap().is_empty());
}

#[test]
fn test_mirror_ignores_relationships_leaving_the_scope() {
    let mut conn = setup();
    let rules = audit_controls_rules();
    let a = audit(1);
    let c1 = control(1);
    relate(&conn, &a, &c1);
    relate(&conn, &c1, &control(99));
    revise(&conn, &c1, RevisionAction::Created);

    upsert_snapshots(&mut conn, &rules, &[a.clone()], &RevisionMap::new(), None, &options(), Hooks::default())
        .unwrap();

    assert!(list_snapshot_relationships(&conn, &a).unwrap().is_empty());
}
