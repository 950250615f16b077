//! Relationship mirror against a real schema

mod common;

use common::{relate, setup, snapshot, USER_ID};
use grcsnap_core::model::Stub;
use grcsnap_store::mirror::{copy_relationships, link_parents, mirror, prune_relationships};
use grcsnap_store::relationships::delete_relationship;
use grcsnap_store::snapshot::{list_parent_links, list_snapshot_relationships};

#[test]
fn test_copy_mirrors_child_relationship_once() {
    let conn = setup();
    let audit = Stub::new("Audit", 1);
    let c1 = Stub::new("Control", 1);
    let c2 = Stub::new("Control", 2);
    relate(&conn, &c1, &c2);
    // The same edge stored the other way round must not yield a second copy
    conn.execute(
        "INSERT INTO relationships (source_type, source_id, destination_type, destination_id,
                                    created_at, updated_at)
         VALUES ('Control', 2, 'Control', 1, 0, 0)",
        [],
    )
    .unwrap();
    let s1 = snapshot(&conn, &audit, &c1);
    let s2 = snapshot(&conn, &audit, &c2);

    assert_eq!(copy_relationships(&conn, &audit, USER_ID).unwrap(), 1);
    assert_eq!(copy_relationships(&conn, &audit, USER_ID).unwrap(), 0);

    let mirrored = list_snapshot_relationships(&conn, &audit).unwrap();
    assert_eq!(mirrored.len(), 1);
    assert!(mirrored[0].connects(&s1.stub(), &s2.stub()));
}

#[test]
fn test_copy_is_scoped_per_parent() {
    let conn = setup();
    let a1 = Stub::new("Audit", 1);
    let a2 = Stub::new("Audit", 2);
    let c1 = Stub::new("Control", 1);
    let c2 = Stub::new("Control", 2);
    relate(&conn, &c1, &c2);
    snapshot(&conn, &a1, &c1);
    snapshot(&conn, &a2, &c2);

    assert_eq!(copy_relationships(&conn, &a1, USER_ID).unwrap(), 0);
    assert_eq!(copy_relationships(&conn, &a2, USER_ID).unwrap(), 0);
}

#[test]
fn test_link_parents_reports_only_new_ids() {
    let conn = setup();
    let audit = Stub::new("Audit", 1);
    snapshot(&conn, &audit, &Stub::new("Control", 1));

    let first = link_parents(&conn, &audit, USER_ID).unwrap();
    assert_eq!(first.len(), 1);

    snapshot(&conn, &audit, &Stub::new("Control", 2));
    let second = link_parents(&conn, &audit, USER_ID).unwrap();
    assert_eq!(second.len(), 1);
    assert_ne!(first, second);
    assert_eq!(list_parent_links(&conn, &audit).unwrap().len(), 2);
}

#[test]
fn test_prune_after_unmapping_children() {
    let conn = setup();
    let audit = Stub::new("Audit", 1);
    let c1 = Stub::new("Control", 1);
    let c2 = Stub::new("Objective", 2);
    relate(&conn, &c2, &c1);
    snapshot(&conn, &audit, &c1);
    snapshot(&conn, &audit, &c2);
    copy_relationships(&conn, &audit, USER_ID).unwrap();

    assert_eq!(prune_relationships(&conn, &audit).unwrap(), 0);
    delete_relationship(&conn, &c1, &c2).unwrap();
    assert_eq!(prune_relationships(&conn, &audit).unwrap(), 1);
    assert!(list_snapshot_relationships(&conn, &audit).unwrap().is_empty());
}

#[test]
fn test_full_pass_is_idempotent() {
    let conn = setup();
    let audit = Stub::new("Audit", 1);
    let c1 = Stub::new("Control", 1);
    let c2 = Stub::new("Control", 2);
    relate(&conn, &c1, &c2);
    snapshot(&conn, &audit, &c1);
    snapshot(&conn, &audit, &c2);

    let first = mirror(&conn, [&audit], USER_ID).unwrap();
    assert_eq!(first.copied, 1);
    assert_eq!(first.parent_links.len(), 2);

    let second = mirror(&conn, [&audit], USER_ID).unwrap();
    assert!(second.is_noop());
}
