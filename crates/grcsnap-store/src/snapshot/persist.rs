//! Bulk snapshot writes.
//!
//! Every statement covers up to `batch_size` rows and reads the affected
//! rows back with `RETURNING`, so callers learn exactly what changed.

use super::{snapshot_from_row, SNAPSHOT_COLUMNS};
use crate::errors::{sqlite_op, Result};
use crate::revision::insert_revisions;
use crate::sql::{effective_batch, list_placeholders, now_ms, tuple_placeholders};
use grcsnap_core::model::{NewRevision, NewSnapshot, RevisionAction, Snapshot, SNAPSHOT_TYPE};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

pub(crate) const INSERT_COLUMNS: usize = 9;

/// Move snapshot `snapshot_id` to `revision_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionUpdate {
    pub snapshot_id: i64,
    pub revision_id: i64,
}

fn query_snapshots(conn: &Connection, op: &'static str, sql: &str, values: Vec<Value>) -> Result<Vec<Snapshot>> {
    let mut stmt = conn.prepare(sql).map_err(sqlite_op(op))?;
    let rows = stmt
        .query_map(params_from_iter(values), snapshot_from_row)
        .map_err(sqlite_op(op))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sqlite_op(op))
}

/// Insert snapshot rows, ignoring any whose pair already has a row.
///
/// Returns only the rows this call created.
pub fn insert_snapshots(
    conn: &Connection,
    snapshots: &[NewSnapshot],
    batch_size: usize,
) -> Result<Vec<Snapshot>> {
    let mut created = Vec::with_capacity(snapshots.len());
    for chunk in snapshots.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "INSERT OR IGNORE INTO snapshots (parent_type, parent_id, child_type, child_id,
                 revision_id, context_id, modified_by_id, created_at, updated_at)
             VALUES {} RETURNING {}",
            tuple_placeholders(chunk.len(), INSERT_COLUMNS, 0),
            SNAPSHOT_COLUMNS
        );
        let mut values = Vec::with_capacity(chunk.len() * INSERT_COLUMNS);
        for snapshot in chunk {
            let pair = &snapshot.pair;
            values.push(Value::Text(pair.parent.object_type.clone()));
            values.push(Value::Integer(pair.parent.id));
            values.push(Value::Text(pair.child.object_type.clone()));
            values.push(Value::Integer(pair.child.id));
            values.push(Value::Integer(snapshot.revision_id));
            values.push(snapshot.context_id.map_or(Value::Null, Value::Integer));
            values.push(Value::Integer(snapshot.modified_by_id));
            values.push(Value::Integer(snapshot.created_at));
            values.push(Value::Integer(snapshot.created_at));
        }
        created.extend(query_snapshots(conn, "insert_snapshots", &sql, values)?);
    }
    tracing::debug!(rows_affected = created.len(), "Inserted snapshots");
    Ok(created)
}

/// Point snapshots at new revisions with one `CASE` update per batch.
///
/// Also clears `retired_at`, reviving rows whose child re-entered scope.
pub fn update_snapshot_revisions(
    conn: &Connection,
    updates: &[RevisionUpdate],
    modified_by_id: i64,
    batch_size: usize,
) -> Result<Vec<Snapshot>> {
    let now = now_ms();
    let mut updated = Vec::with_capacity(updates.len());
    for chunk in updates.chunks(effective_batch(batch_size)) {
        let cases = (0..chunk.len())
            .map(|i| format!("WHEN ?{} THEN ?{}", 2 * i + 3, 2 * i + 4))
            .collect::<Vec<_>>()
            .join(" ");
        let ids = list_placeholders(chunk.len(), 2 + 2 * chunk.len());
        let sql = format!(
            "UPDATE snapshots
             SET revision_id = CASE id {} END,
                 modified_by_id = ?1, updated_at = ?2, retired_at = NULL
             WHERE id IN ({}) RETURNING {}",
            cases, ids, SNAPSHOT_COLUMNS
        );
        let mut values = vec![Value::Integer(modified_by_id), Value::Integer(now)];
        for update in chunk {
            values.push(Value::Integer(update.snapshot_id));
            values.push(Value::Integer(update.revision_id));
        }
        values.extend(chunk.iter().map(|u| Value::Integer(u.snapshot_id)));
        updated.extend(query_snapshots(conn, "update_snapshot_revisions", &sql, values)?);
    }
    tracing::debug!(rows_affected = updated.len(), "Updated snapshot revisions");
    Ok(updated)
}

/// Soft-retire snapshots that are not retired yet. Returns the rows retired.
pub fn retire_snapshots(
    conn: &Connection,
    snapshot_ids: &[i64],
    modified_by_id: i64,
    batch_size: usize,
) -> Result<Vec<Snapshot>> {
    let now = now_ms();
    let mut retired = Vec::new();
    for chunk in snapshot_ids.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "UPDATE snapshots SET retired_at = ?1, updated_at = ?1, modified_by_id = ?2
             WHERE retired_at IS NULL AND id IN ({}) RETURNING {}",
            list_placeholders(chunk.len(), 2),
            SNAPSHOT_COLUMNS
        );
        let mut values = vec![Value::Integer(now), Value::Integer(modified_by_id)];
        values.extend(chunk.iter().copied().map(Value::Integer));
        retired.extend(query_snapshots(conn, "retire_snapshots", &sql, values)?);
    }
    tracing::debug!(rows_affected = retired.len(), "Retired snapshots");
    Ok(retired)
}

/// Hard-delete snapshots together with every relationship touching them.
/// Returns the number of snapshot rows removed.
pub fn delete_snapshots(conn: &Connection, snapshot_ids: &[i64], batch_size: usize) -> Result<usize> {
    let mut deleted = 0;
    for chunk in snapshot_ids.chunks(effective_batch(batch_size)) {
        let ids = list_placeholders(chunk.len(), 1);
        let values: Vec<Value> = std::iter::once(Value::Text(SNAPSHOT_TYPE.to_string()))
            .chain(chunk.iter().copied().map(Value::Integer))
            .collect();

        let relationships = conn
            .execute(
                &format!(
                    "DELETE FROM relationships
                     WHERE (source_type = ?1 AND source_id IN ({ids}))
                        OR (destination_type = ?1 AND destination_id IN ({ids}))",
                    ids = ids
                ),
                params_from_iter(values.iter()),
            )
            .map_err(sqlite_op("delete_snapshots"))?;
        let rows = conn
            .execute(
                &format!("DELETE FROM snapshots WHERE id IN ({})", list_placeholders(chunk.len(), 0)),
                params_from_iter(values.iter().skip(1)),
            )
            .map_err(sqlite_op("delete_snapshots"))?;
        tracing::debug!(
            rows_affected = rows,
            relationships = relationships,
            "Deleted snapshots"
        );
        deleted += rows;
    }
    Ok(deleted)
}

/// Append the audit revision of each snapshot row, tagged with `event_id`.
pub fn write_snapshot_revisions(
    conn: &Connection,
    snapshots: &[Snapshot],
    action: RevisionAction,
    event_id: i64,
    modified_by_id: i64,
    batch_size: usize,
) -> Result<usize> {
    let revisions: Vec<NewRevision> = snapshots
        .iter()
        .map(|snapshot| NewRevision {
            resource: snapshot.stub(),
            action,
            content: snapshot.revision_content(),
            event_id: Some(event_id),
            modified_by_id: Some(modified_by_id),
            context_id: snapshot.context_id,
        })
        .collect();
    insert_revisions(conn, &revisions, batch_size)
}
