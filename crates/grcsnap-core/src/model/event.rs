use super::stub::Stub;
use serde::{Deserialize, Serialize};

/// Grouping record for revisions written by one logical change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// Free-form verb supplied by the caller (`POST`, `PUT`, `BULK`, ...)
    pub action: String,
    pub resource: Option<Stub>,
    pub modified_by_id: Option<i64>,
    pub created_at: i64,
}
