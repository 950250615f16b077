//! Shared fixtures for grcsnap-store integration tests
#![allow(dead_code)]

use grcsnap_core::model::{NewRevision, NewSnapshot, Pair, RevisionAction, Snapshot, Stub};
use grcsnap_store::db::open_in_memory;
use grcsnap_store::migrations::apply_migrations;
use grcsnap_store::relationships::create_relationship;
use grcsnap_store::revision::append_revision;
use grcsnap_store::snapshot::insert_snapshots;
use rusqlite::Connection;

pub const USER_ID: i64 = 1;

/// Migrated in-memory database
pub fn setup() -> Connection {
    let mut conn = open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    conn
}

pub fn revise(conn: &Connection, object: &Stub, action: RevisionAction) -> i64 {
    append_revision(
        conn,
        &NewRevision {
            resource: object.clone(),
            action,
            content: serde_json::json!({"id": object.id}),
            event_id: None,
            modified_by_id: Some(USER_ID),
            context_id: None,
        },
    )
    .unwrap()
    .id
}

pub fn relate(conn: &Connection, a: &Stub, b: &Stub) {
    create_relationship(conn, a, b, None, Some(USER_ID)).unwrap();
}

/// Insert a snapshot of `child` under `parent` at a fresh revision
pub fn snapshot(conn: &Connection, parent: &Stub, child: &Stub) -> Snapshot {
    let revision_id = revise(conn, child, RevisionAction::Created);
    let mut created = insert_snapshots(
        conn,
        &[NewSnapshot {
            pair: Pair::new(parent.clone(), child.clone()),
            revision_id,
            context_id: None,
            modified_by_id: USER_ID,
            created_at: 0,
        }],
        10,
    )
    .unwrap();
    created.remove(0)
}
