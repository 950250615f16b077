//! Object identity value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Object type name used for snapshot rows when they appear as
/// relationship endpoints or revision resources.
pub const SNAPSHOT_TYPE: &str = "Snapshot";

/// Identifies any persisted object by `(type, id)`.
///
/// Ordering is `(type, id)` so sets of stubs iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stub {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: i64,
}

impl Stub {
    pub fn new(object_type: impl Into<String>, id: i64) -> Self {
        Self {
            object_type: object_type.into(),
            id,
        }
    }

    /// Stub for a snapshot row with the given surrogate id
    pub fn snapshot(id: i64) -> Self {
        Self::new(SNAPSHOT_TYPE, id)
    }

    pub fn is_snapshot(&self) -> bool {
        self.object_type == SNAPSHOT_TYPE
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.id)
    }
}

/// Failure to parse the `Type:id` rendering of a stub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StubParseError {
    #[error("expected `Type:id`, got `{0}`")]
    MissingSeparator(String),
    #[error("empty object type in `{0}`")]
    EmptyType(String),
    #[error("invalid object id in `{0}`")]
    InvalidId(String),
}

impl FromStr for Stub {
    type Err = StubParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (object_type, id) = s
            .rsplit_once(':')
            .ok_or_else(|| StubParseError::MissingSeparator(s.to_string()))?;
        if object_type.trim().is_empty() {
            return Err(StubParseError::EmptyType(s.to_string()));
        }
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| StubParseError::InvalidId(s.to_string()))?;
        Ok(Stub::new(object_type.trim(), id))
    }
}

/// Flat storage form of a pair: `(parent_type, parent_id, child_type, child_id)`.
pub type PairTuple = (String, i64, String, i64);

/// One scoping relationship: `child` is (or should be) snapshotted under `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub parent: Stub,
    pub child: Stub,
}

impl Pair {
    pub fn new(parent: Stub, child: Stub) -> Self {
        Self { parent, child }
    }

    pub fn to_tuple(&self) -> PairTuple {
        (
            self.parent.object_type.clone(),
            self.parent.id,
            self.child.object_type.clone(),
            self.child.id,
        )
    }

    pub fn from_tuple(tuple: PairTuple) -> Self {
        let (parent_type, parent_id, child_type, child_id) = tuple;
        Self::new(
            Stub::new(parent_type, parent_id),
            Stub::new(child_type, child_id),
        )
    }
}

impl From<PairTuple> for Pair {
    fn from(tuple: PairTuple) -> Self {
        Pair::from_tuple(tuple)
    }
}

impl From<&Pair> for PairTuple {
    fn from(pair: &Pair) -> Self {
        pair.to_tuple()
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.parent, self.child)
    }
}
