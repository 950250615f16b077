//! Shared fixtures for grcsnap-engine integration tests
#![allow(dead_code)]

use grcsnap_core::errors::{ExError, ExErrorKind, Result};
use grcsnap_core::hooks::{AclHook, ReindexHook};
use grcsnap_core::model::{NewRevision, Pair, RevisionAction, Stub};
use grcsnap_core::rules::{NeighborRule, RuleTable, ScopingRule};
use grcsnap_engine::commands::snapshot::SnapshotOptions;
use grcsnap_store::db::open_in_memory;
use grcsnap_store::migrations::apply_migrations;
use grcsnap_store::relationships::create_relationship;
use grcsnap_store::revision::append_revision;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::BTreeSet;

pub const USER_ID: i64 = 7;

pub fn setup() -> Connection {
    let mut conn = open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    conn
}

pub fn options() -> SnapshotOptions {
    SnapshotOptions::new(USER_ID)
}

pub fn audit(id: i64) -> Stub {
    Stub::new("Audit", id)
}

pub fn control(id: i64) -> Stub {
    Stub::new("Control", id)
}

/// `Audit` scopes its related controls
pub fn audit_controls_rules() -> RuleTable {
    RuleTable::new().with_rule(
        "Audit",
        ScopingRule::first_order([NeighborRule::relation("Control")]),
    )
}

pub fn revise(conn: &Connection, object: &Stub, action: RevisionAction) -> i64 {
    append_revision(
        conn,
        &NewRevision {
            resource: object.clone(),
            action,
            content: serde_json::json!({"type": object.object_type, "id": object.id}),
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

/// Count rows of a table, for mutation-free assertions
pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// Snapshot rows, relationship ids, then revision and event counts
pub type Fingerprint = (Vec<(i64, i64, Option<i64>, i64)>, Vec<i64>, i64, i64);

/// Fingerprint of every mutable table: snapshots with their revision and
/// retirement, all relationships, and the number of revisions and events
pub fn fingerprint(conn: &Connection) -> Fingerprint {
    let mut stmt = conn
        .prepare("SELECT id, revision_id, retired_at, updated_at FROM snapshots ORDER BY id")
        .unwrap();
    let snapshots = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap();
    let mut stmt = conn.prepare("SELECT id FROM relationships ORDER BY id").unwrap();
    let relationships = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap();
    (
        snapshots,
        relationships,
        count(conn, "revisions"),
        count(conn, "events"),
    )
}

/// Records every hook invocation
#[derive(Default)]
pub struct RecordingHooks {
    pub reindexed: RefCell<Vec<BTreeSet<Pair>>>,
    pub acl_batches: RefCell<Vec<Vec<i64>>>,
}

impl ReindexHook for RecordingHooks {
    fn reindex(&self, pairs: &BTreeSet<Pair>) -> Result<()> {
        self.reindexed.borrow_mut().push(pairs.clone());
        Ok(())
    }
}

impl AclHook for RecordingHooks {
    fn relationships_created(&self, relationship_ids: &[i64]) -> Result<()> {
        self.acl_batches.borrow_mut().push(relationship_ids.to_vec());
        Ok(())
    }
}

/// ACL collaborator that rejects every batch
pub struct FailingAcl;

impl AclHook for FailingAcl {
    fn relationships_created(&self, _relationship_ids: &[i64]) -> Result<()> {
        Err(ExError::new(ExErrorKind::ExternalService)
            .with_op("acl_propagation")
            .with_message("ACL service unavailable"))
    }
}
