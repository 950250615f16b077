//! Snapshot read queries.

use super::{snapshot_from_row, SNAPSHOT_COLUMNS};
use crate::errors::{sqlite_op, Result};
use crate::relationships::relationship_from_row;
use crate::sql::{effective_batch, pair_values, stub_values, tuple_placeholders};
use grcsnap_core::errors::{ExError, ExErrorKind};
use grcsnap_core::model::{Pair, Relationship, Snapshot, Stub, SNAPSHOT_TYPE};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Every snapshot under `parent`, retired ones included, by id
pub fn list_snapshots(conn: &Connection, parent: &Stub) -> Result<Vec<Snapshot>> {
    let sql = format!(
        "SELECT {} FROM snapshots WHERE parent_type = ?1 AND parent_id = ?2 ORDER BY id",
        SNAPSHOT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(sqlite_op("list_snapshots"))?;
    let rows = stmt
        .query_map(params![parent.object_type, parent.id], snapshot_from_row)
        .map_err(sqlite_op("list_snapshots"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("list_snapshots"))
}

/// Every snapshot under any of `parents`
pub fn list_snapshots_for_parents(
    conn: &Connection,
    parents: &[&Stub],
    batch_size: usize,
) -> Result<Vec<Snapshot>> {
    let mut snapshots = Vec::new();
    for chunk in parents.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "SELECT {} FROM snapshots WHERE (parent_type, parent_id) IN (VALUES {}) ORDER BY id",
            SNAPSHOT_COLUMNS,
            tuple_placeholders(chunk.len(), 2, 0)
        );
        let mut stmt = conn.prepare(&sql).map_err(sqlite_op("list_snapshots_for_parents"))?;
        let rows = stmt
            .query_map(params_from_iter(stub_values(chunk.iter().copied())), snapshot_from_row)
            .map_err(sqlite_op("list_snapshots_for_parents"))?;
        for row in rows {
            snapshots.push(row.map_err(sqlite_op("list_snapshots_for_parents"))?);
        }
    }
    Ok(snapshots)
}

/// Existing snapshot rows for the given pairs, keyed by pair
pub fn find_snapshots<'a>(
    conn: &Connection,
    pairs: impl IntoIterator<Item = &'a Pair>,
    batch_size: usize,
) -> Result<BTreeMap<Pair, Snapshot>> {
    let pairs: Vec<&Pair> = pairs.into_iter().collect();
    let mut found = BTreeMap::new();
    for chunk in pairs.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "SELECT {} FROM snapshots
             WHERE (parent_type, parent_id, child_type, child_id) IN (VALUES {})",
            SNAPSHOT_COLUMNS,
            tuple_placeholders(chunk.len(), 4, 0)
        );
        let mut stmt = conn.prepare(&sql).map_err(sqlite_op("find_snapshots"))?;
        let rows = stmt
            .query_map(params_from_iter(pair_values(chunk.iter().copied())), snapshot_from_row)
            .map_err(sqlite_op("find_snapshots"))?;
        for row in rows {
            let snapshot = row.map_err(sqlite_op("find_snapshots"))?;
            found.insert(snapshot.pair(), snapshot);
        }
    }
    Ok(found)
}

pub fn find_snapshot(conn: &Connection, pair: &Pair) -> Result<Option<Snapshot>> {
    let sql = format!(
        "SELECT {} FROM snapshots
         WHERE parent_type = ?1 AND parent_id = ?2 AND child_type = ?3 AND child_id = ?4",
        SNAPSHOT_COLUMNS
    );
    conn.query_row(
        &sql,
        params![pair.parent.object_type, pair.parent.id, pair.child.object_type, pair.child.id],
        snapshot_from_row,
    )
    .optional()
    .map_err(sqlite_op("find_snapshot"))
}

/// Load a snapshot by id
///
/// ## Errors
///
/// - `ExErrorKind::NotFound`: no snapshot with that id
pub fn fetch_snapshot(conn: &Connection, snapshot_id: i64) -> Result<Snapshot> {
    let sql = format!("SELECT {} FROM snapshots WHERE id = ?1", SNAPSHOT_COLUMNS);
    conn.query_row(&sql, params![snapshot_id], snapshot_from_row)
        .optional()
        .map_err(sqlite_op("fetch_snapshot"))?
        .ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("fetch_snapshot")
                .with_entity_id(Stub::snapshot(snapshot_id).to_string())
                .with_message("Snapshot not found")
        })
}

/// Snapshot-to-snapshot relationships whose endpoints both sit under `parent`
pub fn list_snapshot_relationships(conn: &Connection, parent: &Stub) -> Result<Vec<Relationship>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, r.source_type, r.source_id, r.destination_type, r.destination_id,
                    r.context_id, r.modified_by_id
             FROM relationships r
             JOIN snapshots s1 ON r.source_type = ?3 AND s1.id = r.source_id
             JOIN snapshots s2 ON r.destination_type = ?3 AND s2.id = r.destination_id
             WHERE s1.parent_type = ?1 AND s1.parent_id = ?2
               AND s2.parent_type = ?1 AND s2.parent_id = ?2
             ORDER BY r.id",
        )
        .map_err(sqlite_op("list_snapshot_relationships"))?;
    let rows = stmt
        .query_map(
            params![parent.object_type, parent.id, SNAPSHOT_TYPE],
            relationship_from_row,
        )
        .map_err(sqlite_op("list_snapshot_relationships"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("list_snapshot_relationships"))
}

/// Relationships linking `parent` directly to its own snapshots
pub fn list_parent_links(conn: &Connection, parent: &Stub) -> Result<Vec<Relationship>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, r.source_type, r.source_id, r.destination_type, r.destination_id,
                    r.context_id, r.modified_by_id
             FROM relationships r
             JOIN snapshots s ON s.parent_type = ?1 AND s.parent_id = ?2
             WHERE (r.source_type = ?1 AND r.source_id = ?2
                    AND r.destination_type = ?3 AND r.destination_id = s.id)
                OR (r.destination_type = ?1 AND r.destination_id = ?2
                    AND r.source_type = ?3 AND r.source_id = s.id)
             ORDER BY r.id",
        )
        .map_err(sqlite_op("list_parent_links"))?;
    let rows = stmt
        .query_map(
            params![parent.object_type, parent.id, SNAPSHOT_TYPE],
            relationship_from_row,
        )
        .map_err(sqlite_op("list_parent_links"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("list_parent_links"))
}
