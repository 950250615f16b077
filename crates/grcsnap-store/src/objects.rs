//! Object directory
//!
//! A minimal stand-in for the generic object model: each object's context
//! and its direct attribute links. The snapshotter only reads it through
//! the `ObjectResolver` trait.

use crate::errors::{sqlite_op, Result};
use grcsnap_core::hooks::ObjectResolver;
use grcsnap_core::model::Stub;
use rusqlite::{params, Connection, OptionalExtension};

/// Register an object, or move it to a different context.
pub fn upsert_object(conn: &Connection, object: &Stub, context_id: Option<i64>) -> Result<()> {
    conn.execute(
        "INSERT INTO objects (object_type, object_id, context_id) VALUES (?1, ?2, ?3)
         ON CONFLICT (object_type, object_id) DO UPDATE SET context_id = excluded.context_id",
        params![object.object_type, object.id, context_id],
    )
    .map_err(sqlite_op("upsert_object"))?;
    Ok(())
}

/// Point attribute `name` of `object` at `target`, replacing any previous value.
pub fn set_attribute(conn: &Connection, object: &Stub, name: &str, target: &Stub) -> Result<()> {
    conn.execute(
        "INSERT INTO object_attributes (object_type, object_id, name, target_type, target_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (object_type, object_id, name)
         DO UPDATE SET target_type = excluded.target_type, target_id = excluded.target_id",
        params![object.object_type, object.id, name, target.object_type, target.id],
    )
    .map_err(sqlite_op("set_attribute"))?;
    Ok(())
}

/// Clear attribute `name` of `object`. Returns whether a value was removed.
pub fn clear_attribute(conn: &Connection, object: &Stub, name: &str) -> Result<bool> {
    let removed = conn
        .execute(
            "DELETE FROM object_attributes
             WHERE object_type = ?1 AND object_id = ?2 AND name = ?3",
            params![object.object_type, object.id, name],
        )
        .map_err(sqlite_op("clear_attribute"))?;
    Ok(removed > 0)
}

/// `ObjectResolver` over the `objects` and `object_attributes` tables
pub struct SqliteObjectDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ObjectResolver for SqliteObjectDirectory<'_> {
    fn context_id(&self, object: &Stub) -> Result<Option<i64>> {
        let context: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT context_id FROM objects WHERE object_type = ?1 AND object_id = ?2",
                params![object.object_type, object.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_op("object_context_id"))?;
        Ok(context.flatten())
    }

    fn attribute(&self, object: &Stub, name: &str) -> Result<Option<Stub>> {
        self.conn
            .query_row(
                "SELECT target_type, target_id FROM object_attributes
                 WHERE object_type = ?1 AND object_id = ?2 AND name = ?3",
                params![object.object_type, object.id, name],
                |row| Ok(Stub::new(row.get::<_, String>(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sqlite_op("object_attribute"))
    }
}
