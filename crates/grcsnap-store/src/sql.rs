//! Helpers for building multi-row statements.

use grcsnap_core::model::{Pair, Stub};
use crate::snapshot::persist::INSERT_COLUMNS;
use rusqlite::types::Value;

/// Rows per multi-row statement unless the caller configures otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// SQLite's host parameter limit (`SQLITE_MAX_VARIABLE_NUMBER`)
pub(crate) const MAX_HOST_PARAMETERS: usize = 32766;

/// Largest batch every multi-row statement can bind.
///
/// Bounded by the widest row, the snapshot insert.
pub const MAX_BATCH_SIZE: usize = MAX_HOST_PARAMETERS / INSERT_COLUMNS;

/// `?1, ?2, ...` numbered from `offset + 1`
pub(crate) fn list_placeholders(count: usize, offset: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", offset + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(?1, ?2), (?3, ?4), ...` for `rows` tuples of `width` values
pub(crate) fn tuple_placeholders(rows: usize, width: usize, offset: usize) -> String {
    (0..rows)
        .map(|row| format!("({})", list_placeholders(width, offset + row * width)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn stub_values<'a>(stubs: impl IntoIterator<Item = &'a Stub>) -> Vec<Value> {
    stubs
        .into_iter()
        .flat_map(|stub| [Value::Text(stub.object_type.clone()), Value::Integer(stub.id)])
        .collect()
}

pub(crate) fn pair_values<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> Vec<Value> {
    pairs
        .into_iter()
        .flat_map(|pair| {
            [
                Value::Text(pair.parent.object_type.clone()),
                Value::Integer(pair.parent.id),
                Value::Text(pair.child.object_type.clone()),
                Value::Integer(pair.child.id),
            ]
        })
        .collect()
}

pub(crate) fn text_values<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Value> {
    names
        .into_iter()
        .map(|name| Value::Text(name.to_string()))
        .collect()
}

/// Batch size clamped to `1..=MAX_BATCH_SIZE`, whatever the caller passed
pub(crate) fn effective_batch(batch_size: usize) -> usize {
    batch_size.clamp(1, MAX_BATCH_SIZE)
}

/// Milliseconds since epoch
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
