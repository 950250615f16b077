//! Generic relationship edges.
//!
//! The stored orientation is an artifact of whoever wrote the row, so every
//! lookup here checks both orientations.

use crate::errors::{sqlite_op, Result};
use crate::sql::now_ms;
use grcsnap_core::model::{Relationship, Stub};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_RELATIONSHIP: &str = "SELECT id, source_type, source_id, destination_type, \
     destination_id, context_id, modified_by_id FROM relationships";

pub(crate) fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        source: Stub::new(row.get::<_, String>(1)?, row.get(2)?),
        destination: Stub::new(row.get::<_, String>(3)?, row.get(4)?),
        context_id: row.get(5)?,
        modified_by_id: row.get(6)?,
    })
}

/// Relate `source` and `destination`. Returns the existing edge when the two
/// are already related in either orientation.
pub fn create_relationship(
    conn: &Connection,
    source: &Stub,
    destination: &Stub,
    context_id: Option<i64>,
    modified_by_id: Option<i64>,
) -> Result<Relationship> {
    if let Some(existing) = find_relationship(conn, source, destination)? {
        return Ok(existing);
    }
    let now = now_ms();
    conn.execute(
        "INSERT INTO relationships (source_type, source_id, destination_type, destination_id,
                                    context_id, modified_by_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            source.object_type,
            source.id,
            destination.object_type,
            destination.id,
            context_id,
            modified_by_id,
            now
        ],
    )
    .map_err(sqlite_op("create_relationship"))?;

    Ok(Relationship {
        id: conn.last_insert_rowid(),
        source: source.clone(),
        destination: destination.clone(),
        context_id,
        modified_by_id,
    })
}

/// The edge between `a` and `b` in either orientation
pub fn find_relationship(conn: &Connection, a: &Stub, b: &Stub) -> Result<Option<Relationship>> {
    let sql = format!(
        "{} WHERE (source_type = ?1 AND source_id = ?2 AND destination_type = ?3 AND destination_id = ?4)
            OR (source_type = ?3 AND source_id = ?4 AND destination_type = ?1 AND destination_id = ?2)
         ORDER BY id LIMIT 1",
        SELECT_RELATIONSHIP
    );
    conn.query_row(
        &sql,
        params![a.object_type, a.id, b.object_type, b.id],
        relationship_from_row,
    )
    .optional()
    .map_err(sqlite_op("find_relationship"))
}

/// Remove the edge between `a` and `b`, whichever way it was stored.
/// Returns the number of rows removed.
pub fn delete_relationship(conn: &Connection, a: &Stub, b: &Stub) -> Result<usize> {
    conn.execute(
        "DELETE FROM relationships
         WHERE (source_type = ?1 AND source_id = ?2 AND destination_type = ?3 AND destination_id = ?4)
            OR (source_type = ?3 AND source_id = ?4 AND destination_type = ?1 AND destination_id = ?2)",
        params![a.object_type, a.id, b.object_type, b.id],
    )
    .map_err(sqlite_op("delete_relationship"))
}

/// Every edge touching `object`
pub fn list_relationships(conn: &Connection, object: &Stub) -> Result<Vec<Relationship>> {
    let sql = format!(
        "{} WHERE (source_type = ?1 AND source_id = ?2)
            OR (destination_type = ?1 AND destination_id = ?2)
         ORDER BY id",
        SELECT_RELATIONSHIP
    );
    let mut stmt = conn.prepare(&sql).map_err(sqlite_op("list_relationships"))?;
    let rows = stmt
        .query_map(params![object.object_type, object.id], relationship_from_row)
        .map_err(sqlite_op("list_relationships"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("list_relationships"))
}

/// Objects of `neighbor_type` related to `object`, in either orientation
pub fn related_of_type(conn: &Connection, object: &Stub, neighbor_type: &str) -> Result<Vec<Stub>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT destination_type, destination_id FROM relationships
             WHERE source_type = ?1 AND source_id = ?2 AND destination_type = ?3
             UNION
             SELECT source_type, source_id FROM relationships
             WHERE destination_type = ?1 AND destination_id = ?2 AND source_type = ?3",
        )
        .map_err(sqlite_op("related_of_type"))?;
    let rows = stmt
        .query_map(params![object.object_type, object.id, neighbor_type], |row| {
            Ok(Stub::new(row.get::<_, String>(0)?, row.get(1)?))
        })
        .map_err(sqlite_op("related_of_type"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_op("related_of_type"))
}
