//! Relationship mirror
//!
//! Three bulk statements per parent, run in this order after snapshot rows
//! were written:
//!
//! 1. `copy_relationships`: relate two snapshots of the same parent when
//!    their children are related
//! 2. `link_parents`: relate the parent to each of its snapshots
//! 3. `prune_relationships`: drop snapshot-to-snapshot edges whose
//!    children are no longer related
//!
//! Relationships are undirected in meaning, so every existence check looks
//! at both orientations.

use crate::errors::{sqlite_op, Result};
use crate::snapshot::list_parent_links;
use crate::sql::now_ms;
use grcsnap_core::model::{Stub, SNAPSHOT_TYPE};
use grcsnap_core::response::MirrorCounts;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// Copy child-to-child relationships onto the snapshots of `parent`.
/// Returns the number of relationships created.
pub fn copy_relationships(conn: &Connection, parent: &Stub, modified_by_id: i64) -> Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO relationships (source_type, source_id, destination_type,
             destination_id, context_id, modified_by_id, created_at, updated_at)
         SELECT DISTINCT ?3, MIN(s1.id, s2.id), ?3, MAX(s1.id, s2.id),
                s1.context_id, ?4, ?5, ?5
         FROM snapshots s1
         JOIN snapshots s2
           ON s2.parent_type = s1.parent_type AND s2.parent_id = s1.parent_id
          AND s2.id <> s1.id
         JOIN relationships r
           ON r.source_type = s1.child_type AND r.source_id = s1.child_id
          AND r.destination_type = s2.child_type AND r.destination_id = s2.child_id
         WHERE s1.parent_type = ?1 AND s1.parent_id = ?2
           AND NOT EXISTS (
               SELECT 1 FROM relationships x
               WHERE x.source_type = ?3 AND x.destination_type = ?3
                 AND ((x.source_id = s1.id AND x.destination_id = s2.id)
                   OR (x.source_id = s2.id AND x.destination_id = s1.id)))",
        params![parent.object_type, parent.id, SNAPSHOT_TYPE, modified_by_id, now_ms()],
    )
    .map_err(sqlite_op("copy_relationships"))
}

/// Relate `parent` to each of its snapshots. Returns the ids of the
/// relationships this call created.
pub fn link_parents(conn: &Connection, parent: &Stub, modified_by_id: i64) -> Result<Vec<i64>> {
    let before = parent_link_ids(conn, parent)?;
    conn.execute(
        "INSERT OR IGNORE INTO relationships (source_type, source_id, destination_type,
             destination_id, context_id, modified_by_id, created_at, updated_at)
         SELECT ?1, ?2, ?3, s.id, s.context_id, ?4, ?5, ?5
         FROM snapshots s
         WHERE s.parent_type = ?1 AND s.parent_id = ?2
           AND NOT EXISTS (
               SELECT 1 FROM relationships x
               WHERE (x.source_type = ?1 AND x.source_id = ?2
                      AND x.destination_type = ?3 AND x.destination_id = s.id)
                  OR (x.source_type = ?3 AND x.source_id = s.id
                      AND x.destination_type = ?1 AND x.destination_id = ?2))",
        params![parent.object_type, parent.id, SNAPSHOT_TYPE, modified_by_id, now_ms()],
    )
    .map_err(sqlite_op("link_parents"))?;
    let after = parent_link_ids(conn, parent)?;
    Ok(after.difference(&before).copied().collect())
}

/// Remove snapshot-to-snapshot relationships under `parent` whose children
/// are no longer related in either orientation. Returns the number removed.
pub fn prune_relationships(conn: &Connection, parent: &Stub) -> Result<usize> {
    conn.execute(
        "DELETE FROM relationships WHERE id IN (
             SELECT r.id
             FROM relationships r
             JOIN snapshots s1 ON r.source_type = ?3 AND s1.id = r.source_id
             JOIN snapshots s2 ON r.destination_type = ?3 AND s2.id = r.destination_id
             LEFT JOIN relationships fwd
               ON fwd.source_type = s1.child_type AND fwd.source_id = s1.child_id
              AND fwd.destination_type = s2.child_type AND fwd.destination_id = s2.child_id
             LEFT JOIN relationships bwd
               ON bwd.source_type = s2.child_type AND bwd.source_id = s2.child_id
              AND bwd.destination_type = s1.child_type AND bwd.destination_id = s1.child_id
             WHERE s1.parent_type = ?1 AND s1.parent_id = ?2
               AND s2.parent_type = ?1 AND s2.parent_id = ?2
               AND fwd.id IS NULL AND bwd.id IS NULL)",
        params![parent.object_type, parent.id, SNAPSHOT_TYPE],
    )
    .map_err(sqlite_op("prune_relationships"))
}

/// Run all three mirror operations for every parent
pub fn mirror<'p>(
    conn: &Connection,
    parents: impl IntoIterator<Item = &'p Stub>,
    modified_by_id: i64,
) -> Result<MirrorCounts> {
    let mut counts = MirrorCounts::default();
    for parent in parents {
        counts.copied += copy_relationships(conn, parent, modified_by_id)?;
        counts.parent_links.extend(link_parents(conn, parent, modified_by_id)?);
        counts.pruned += prune_relationships(conn, parent)?;
    }
    tracing::debug!(
        copied = counts.copied,
        parent_links = counts.parent_links.len(),
        pruned = counts.pruned,
        "Mirrored relationships"
    );
    Ok(counts)
}

fn parent_link_ids(conn: &Connection, parent: &Stub) -> Result<BTreeSet<i64>> {
    Ok(list_parent_links(conn, parent)?
        .into_iter()
        .map(|relationship| relationship.id)
        .collect())
}
