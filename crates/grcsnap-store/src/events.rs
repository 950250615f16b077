//! Event rows: the grouping record every revision of one logical change points at.

use crate::errors::{sqlite_op, Result};
use crate::sql::now_ms;
use grcsnap_core::errors::{ExError, ExErrorKind};
use grcsnap_core::model::{Event, Stub};
use rusqlite::{params, Connection, OptionalExtension};

/// Persist a new event and return it with its assigned id.
pub fn create_event(
    conn: &Connection,
    action: &str,
    resource: Option<&Stub>,
    modified_by_id: Option<i64>,
) -> Result<Event> {
    if action.trim().is_empty() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("create_event")
            .with_message("Event action must not be empty"));
    }
    let created_at = now_ms();
    conn.execute(
        "INSERT INTO events (action, resource_type, resource_id, modified_by_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action,
            resource.map(|r| r.object_type.as_str()),
            resource.map(|r| r.id),
            modified_by_id,
            created_at
        ],
    )
    .map_err(sqlite_op("create_event"))?;

    let event = Event {
        id: conn.last_insert_rowid(),
        action: action.to_string(),
        resource: resource.cloned(),
        modified_by_id,
        created_at,
    };
    tracing::debug!(event_id = event.id, action = action, "Created event");
    Ok(event)
}

/// Load an event by id
///
/// ## Errors
///
/// - `ExErrorKind::NotFound`: no event with that id
pub fn fetch_event(conn: &Connection, event_id: i64) -> Result<Event> {
    conn.query_row(
        "SELECT id, action, resource_type, resource_id, modified_by_id, created_at
         FROM events WHERE id = ?1",
        params![event_id],
        |row| {
            let resource_type: Option<String> = row.get(2)?;
            let resource_id: Option<i64> = row.get(3)?;
            Ok(Event {
                id: row.get(0)?,
                action: row.get(1)?,
                resource: resource_type.zip(resource_id).map(|(t, id)| Stub::new(t, id)),
                modified_by_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
    .map_err(sqlite_op("fetch_event"))?
    .ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("fetch_event")
            .with_entity_id(event_id.to_string())
            .with_message("Event not found")
    })
}
