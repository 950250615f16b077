//! Generic many-to-many edges.

use super::stub::Stub;
use serde::{Deserialize, Serialize};

/// An edge between two objects. Undirected in meaning: the stored
/// orientation is whatever the writer happened to choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub source: Stub,
    pub destination: Stub,
    pub context_id: Option<i64>,
    pub modified_by_id: Option<i64>,
}

impl Relationship {
    /// The endpoint opposite `stub`, if `stub` is an endpoint at all
    pub fn other_end(&self, stub: &Stub) -> Option<&Stub> {
        if &self.source == stub {
            Some(&self.destination)
        } else if &self.destination == stub {
            Some(&self.source)
        } else {
            None
        }
    }

    /// True when the edge joins `a` and `b` in either orientation
    pub fn connects(&self, a: &Stub, b: &Stub) -> bool {
        (&self.source == a && &self.destination == b)
            || (&self.source == b && &self.destination == a)
    }
}
