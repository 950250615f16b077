//! Append-only revision history.
//!
//! Revisions of ordinary objects are produced outside the snapshotter; the
//! snapshotter only appends revisions of its own snapshot rows.

use crate::errors::{sqlite_op, Result};
use crate::sql::{effective_batch, now_ms, tuple_placeholders};
use grcsnap_core::errors::{ExError, ExErrorKind};
use grcsnap_core::model::{NewRevision, Revision, RevisionAction, Stub};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const REVISION_COLUMNS: usize = 8;

const SELECT_REVISION: &str = "SELECT id, resource_type, resource_id, action, content, \
     event_id, modified_by_id, context_id, created_at FROM revisions";

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<Revision> {
    let action: String = row.get(3)?;
    let action = action.parse::<RevisionAction>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Revision {
        id: row.get(0)?,
        resource_type: row.get(1)?,
        resource_id: row.get(2)?,
        action,
        content: row.get(4)?,
        event_id: row.get(5)?,
        modified_by_id: row.get(6)?,
        context_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Append one revision and return it with its id.
pub fn append_revision(conn: &Connection, revision: &NewRevision) -> Result<Revision> {
    let created_at = now_ms();
    conn.execute(
        "INSERT INTO revisions (resource_type, resource_id, action, content, event_id,
                                modified_by_id, context_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            revision.resource.object_type,
            revision.resource.id,
            revision.action.as_str(),
            revision.content,
            revision.event_id,
            revision.modified_by_id,
            revision.context_id,
            created_at
        ],
    )
    .map_err(sqlite_op("append_revision"))?;

    Ok(Revision {
        id: conn.last_insert_rowid(),
        resource_type: revision.resource.object_type.clone(),
        resource_id: revision.resource.id,
        action: revision.action,
        content: revision.content.clone(),
        event_id: revision.event_id,
        modified_by_id: revision.modified_by_id,
        context_id: revision.context_id,
        created_at,
    })
}

/// Append many revisions with multi-row inserts of at most `batch_size`
/// rows each. Returns the number of rows written.
pub fn insert_revisions(
    conn: &Connection,
    revisions: &[NewRevision],
    batch_size: usize,
) -> Result<usize> {
    let created_at = now_ms();
    let mut written = 0;
    for chunk in revisions.chunks(effective_batch(batch_size)) {
        let sql = format!(
            "INSERT INTO revisions (resource_type, resource_id, action, content, event_id,
                                    modified_by_id, context_id, created_at) VALUES {}",
            tuple_placeholders(chunk.len(), REVISION_COLUMNS, 0)
        );
        let mut values = Vec::with_capacity(chunk.len() * REVISION_COLUMNS);
        for revision in chunk {
            values.push(Value::Text(revision.resource.object_type.clone()));
            values.push(Value::Integer(revision.resource.id));
            values.push(Value::Text(revision.action.as_str().to_string()));
            values.push(Value::Text(revision.content.to_string()));
            values.push(revision.event_id.map_or(Value::Null, Value::Integer));
            values.push(revision.modified_by_id.map_or(Value::Null, Value::Integer));
            values.push(revision.context_id.map_or(Value::Null, Value::Integer));
            values.push(Value::Integer(created_at));
        }
        written += conn
            .execute(&sql, params_from_iter(values))
            .map_err(sqlite_op("insert_revisions"))?;
    }
    tracing::debug!(rows_affected = written, "Inserted revisions");
    Ok(written)
}

/// Every revision of `resource`, oldest first
pub fn list_revisions(conn: &Connection, resource: &Stub) -> Result<Vec<Revision>> {
    let sql = format!(
        "{} WHERE resource_type = ?1 AND resource_id = ?2 ORDER BY id",
        SELECT_REVISION
    );
    let mut stmt = conn.prepare(&sql).map_err(sqlite_op("list_revisions"))?;
    let rows = stmt
        .query_map(params![resource.object_type, resource.id], revision_from_row)
        .map_err(sqlite_op("list_revisions"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("list_revisions"))
}

/// Load one revision
///
/// ## Errors
///
/// - `ExErrorKind::NotFound`: no revision with that id
pub fn fetch_revision(conn: &Connection, revision_id: i64) -> Result<Revision> {
    let sql = format!("{} WHERE id = ?1", SELECT_REVISION);
    conn.query_row(&sql, params![revision_id], revision_from_row)
        .optional()
        .map_err(sqlite_op("fetch_revision"))?
        .ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("fetch_revision")
                .with_entity_id(revision_id.to_string())
                .with_message("Revision not found")
        })
}
