//! Revision resolver
//!
//! Maps each pair to the revision of its child that a snapshot should point
//! at: an explicit override when the caller supplied one, otherwise the
//! child's newest `created` or `modified` revision. Pairs with neither are
//! reported as missed and never raise.

use crate::errors::{sqlite_op, Result};
use crate::sql::{effective_batch, stub_values, tuple_placeholders};
use grcsnap_core::model::{Pair, Stub};
use grcsnap_core::response::RevisionMap;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRevisions {
    pub revisions: RevisionMap,
    /// Pairs whose child has no snapshottable revision
    pub missed: BTreeSet<Pair>,
}

/// Resolve a revision for every pair in `pairs`.
///
/// Overrides are honored only for pairs that were asked about and are
/// taken as given, with no lookup.
pub fn resolve_revisions(
    conn: &Connection,
    pairs: &BTreeSet<Pair>,
    overrides: &RevisionMap,
    batch_size: usize,
) -> Result<ResolvedRevisions> {
    let mut resolved = ResolvedRevisions::default();
    let mut pending: Vec<&Pair> = Vec::new();
    for pair in pairs {
        match overrides.get(pair) {
            Some(revision_id) => {
                resolved.revisions.insert(pair.clone(), *revision_id);
            }
            None => pending.push(pair),
        }
    }
    if pending.is_empty() {
        return Ok(resolved);
    }

    let children: BTreeSet<&Stub> = pending.iter().map(|pair| &pair.child).collect();
    let latest = latest_revisions(conn, children.into_iter().collect(), batch_size)?;

    for pair in pending {
        match latest.get(&pair.child) {
            Some(revision_id) => {
                resolved.revisions.insert(pair.clone(), *revision_id);
            }
            None => {
                tracing::warn!(
                    parent = %pair.parent,
                    child = %pair.child,
                    "No snapshottable revision for child, skipping pair"
                );
                resolved.missed.insert(pair.clone());
            }
        }
    }
    Ok(resolved)
}

/// Newest non-deleted revision id per child
fn latest_revisions(
    conn: &Connection,
    children: Vec<&Stub>,
    batch_size: usize,
) -> Result<BTreeMap<Stub, i64>> {
    let mut latest = BTreeMap::new();
    for chunk in children.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "SELECT resource_type, resource_id, MAX(id) FROM revisions
             WHERE (resource_type, resource_id) IN (VALUES {})
               AND action IN ('created', 'modified')
             GROUP BY resource_type, resource_id",
            tuple_placeholders(chunk.len(), 2, 0)
        );
        let mut stmt = conn.prepare(&sql).map_err(sqlite_op("resolve_revisions"))?;
        let rows = stmt
            .query_map(params_from_iter(stub_values(chunk.iter().copied())), |row| {
                Ok((Stub::new(row.get::<_, String>(0)?, row.get(1)?), row.get::<_, i64>(2)?))
            })
            .map_err(sqlite_op("resolve_revisions"))?;
        for row in rows {
            let (child, revision_id) = row.map_err(sqlite_op("resolve_revisions"))?;
            latest.insert(child, revision_id);
        }
    }
    Ok(latest)
}
