//! Scope reconciliation: desired pairs vs persisted pairs.

use crate::model::Pair;
use serde::Serialize;
use std::collections::BTreeSet;

/// Three-way split of one parent set's pairs.
///
/// - `keep`: persisted and still in the computed scope
/// - `stale`: persisted but no longer in the computed scope
/// - `new`: in the computed scope with no persisted row yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeDiff {
    pub keep: BTreeSet<Pair>,
    pub stale: BTreeSet<Pair>,
    pub new: BTreeSet<Pair>,
}

impl ScopeDiff {
    pub fn compute(desired: &BTreeSet<Pair>, existing: &BTreeSet<Pair>) -> Self {
        Self {
            keep: desired.intersection(existing).cloned().collect(),
            stale: existing.difference(desired).cloned().collect(),
            new: desired.difference(existing).cloned().collect(),
        }
    }

    pub fn for_create(&self) -> BTreeSet<Pair> {
        self.new.clone()
    }

    /// Every persisted pair, in scope or not
    pub fn for_update(&self) -> BTreeSet<Pair> {
        self.keep.union(&self.stale).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.stale.is_empty() && self.new.is_empty()
    }
}
