//! Result envelope returned by every snapshotter operation.

use crate::model::Pair;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Child revision chosen for each pair.
pub type RevisionMap = BTreeMap<Pair, i64>;

/// Row counts from one relationship mirror pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorCounts {
    /// Snapshot-to-snapshot relationships created
    pub copied: usize,
    /// Parent-to-snapshot relationship ids created (handed to ACL propagation)
    pub parent_links: Vec<i64>,
    /// Snapshot-to-snapshot relationships removed
    pub pruned: usize,
}

impl MirrorCounts {
    pub fn is_noop(&self) -> bool {
        self.copied == 0 && self.parent_links.is_empty() && self.pruned == 0
    }
}

/// Informational payload of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationExtra {
    /// Full resolution map of the pass: every pair the pass considered and
    /// resolved, including pairs left unchanged because their snapshot was
    /// already current or was inserted by a concurrent writer. The mutated
    /// pairs are the operation's `response`.
    #[serde(serialize_with = "serialize_revision_map")]
    pub revisions: RevisionMap,
    /// Pairs skipped because no snapshottable revision exists
    pub missed: BTreeSet<Pair>,
    /// Present when the relationship mirror ran
    pub mirror: Option<MirrorCounts>,
    pub dry_run: bool,
}

/// `{operation_name, success, response, extra_data}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResponse<T> {
    pub operation: String,
    pub success: bool,
    pub response: T,
    pub extra: OperationExtra,
}

impl<T> OperationResponse<T> {
    pub fn new(operation: impl Into<String>, response: T, extra: OperationExtra) -> Self {
        Self {
            operation: operation.into(),
            success: true,
            response,
            extra,
        }
    }
}

#[derive(Serialize)]
struct RevisionEntry<'a> {
    #[serde(flatten)]
    pair: &'a Pair,
    revision_id: i64,
}

fn serialize_revision_map<S: Serializer>(map: &RevisionMap, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(
        map.iter()
            .map(|(pair, revision_id)| RevisionEntry {
                pair,
                revision_id: *revision_id,
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stub;

    #[test]
    fn test_revision_map_serializes_as_list() {
        let pair = Pair::new(Stub::new("Audit", 1), Stub::new("Control", 2));
        let mut extra = OperationExtra::default();
        extra.revisions.insert(pair.clone(), 11);
        let response = OperationResponse::new("create", vec![pair], extra);

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["operation"], "create");
        assert_eq!(json["success"], true);
        assert_eq!(json["extra"]["revisions"][0]["revision_id"], 11);
        assert_eq!(json["extra"]["revisions"][0]["child"]["type"], "Control");
    }
}
