//! Append-only revision history.

use super::stub::Stub;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionAction {
    Created,
    Modified,
    Deleted,
}

impl RevisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionAction::Created => "created",
            RevisionAction::Modified => "modified",
            RevisionAction::Deleted => "deleted",
        }
    }

    /// Whether a snapshot may point at a revision with this action.
    pub fn is_snapshottable(&self) -> bool {
        !matches!(self, RevisionAction::Deleted)
    }
}

impl fmt::Display for RevisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown revision action `{0}`")]
pub struct RevisionActionError(pub String);

impl FromStr for RevisionAction {
    type Err = RevisionActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RevisionAction::Created),
            "modified" => Ok(RevisionAction::Modified),
            "deleted" => Ok(RevisionAction::Deleted),
            other => Err(RevisionActionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub resource_type: String,
    pub resource_id: i64,
    pub action: RevisionAction,
    pub content: serde_json::Value,
    pub event_id: Option<i64>,
    pub modified_by_id: Option<i64>,
    pub context_id: Option<i64>,
    pub created_at: i64,
}

impl Revision {
    pub fn resource(&self) -> Stub {
        Stub::new(self.resource_type.clone(), self.resource_id)
    }
}

/// A revision row about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRevision {
    pub resource: Stub,
    pub action: RevisionAction,
    pub content: serde_json::Value,
    pub event_id: Option<i64>,
    pub modified_by_id: Option<i64>,
    pub context_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trips_through_str() {
        for action in [
            RevisionAction::Created,
            RevisionAction::Modified,
            RevisionAction::Deleted,
        ] {
            assert_eq!(action.as_str().parse::<RevisionAction>(), Ok(action));
        }
        assert!("archived".parse::<RevisionAction>().is_err());
    }

    #[test]
    fn test_deleted_is_not_snapshottable() {
        assert!(RevisionAction::Created.is_snapshottable());
        assert!(RevisionAction::Modified.is_snapshottable());
        assert!(!RevisionAction::Deleted.is_snapshottable());
    }
}
