//! Snapshot rows.

use super::stub::{Pair, Stub};
use serde::{Deserialize, Serialize};

/// A persisted snapshot row.
///
/// `(parent_type, parent_id, child_type, child_id)` is the business key; the
/// store enforces at most one row per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub parent_type: String,
    pub parent_id: i64,
    pub child_type: String,
    pub child_id: i64,
    pub revision_id: i64,
    /// Inherited from the parent when the row was created; never recomputed
    pub context_id: Option<i64>,
    pub modified_by_id: i64,
    /// Milliseconds since epoch
    pub created_at: i64,
    pub updated_at: i64,
    /// Set when a stale-scope policy soft-retired the row
    pub retired_at: Option<i64>,
}

impl Snapshot {
    pub fn parent(&self) -> Stub {
        Stub::new(self.parent_type.clone(), self.parent_id)
    }

    pub fn child(&self) -> Stub {
        Stub::new(self.child_type.clone(), self.child_id)
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.parent(), self.child())
    }

    pub fn stub(&self) -> Stub {
        Stub::snapshot(self.id)
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    /// Point-in-time content recorded in the snapshot's own audit revisions
    pub fn revision_content(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "parent_type": self.parent_type,
            "parent_id": self.parent_id,
            "child_type": self.child_type,
            "child_id": self.child_id,
            "revision_id": self.revision_id,
            "context_id": self.context_id,
            "modified_by_id": self.modified_by_id,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "retired_at": self.retired_at,
        })
    }
}

/// A snapshot row about to be inserted (no surrogate id yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub pair: Pair,
    pub revision_id: i64,
    pub context_id: Option<i64>,
    pub modified_by_id: i64,
    pub created_at: i64,
}
