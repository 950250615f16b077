//! Stale snapshot policy
//!
//! A snapshot is stale when its child is no longer in the parent's computed
//! scope. The policy decides what happens to such rows during an upsert.
//! Policies are injected into the generator, so the default (refresh, the
//! historical behavior) can be swapped per caller.

use crate::diff::ScopeDiff;
use crate::errors::{ExError, ExErrorKind};
use crate::model::Pair;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// What to do with one stale snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleDisposition {
    /// Treat like an in-scope row: move it to the child's latest revision
    #[default]
    Refresh,
    /// Leave the row exactly as it is
    Freeze,
    /// Mark the row retired and stop refreshing it
    Retire,
    /// Remove the row and every relationship touching it
    Delete,
}

impl StaleDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaleDisposition::Refresh => "refresh",
            StaleDisposition::Freeze => "freeze",
            StaleDisposition::Retire => "retire",
            StaleDisposition::Delete => "delete",
        }
    }
}

impl FromStr for StaleDisposition {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(StaleDisposition::Refresh),
            "freeze" => Ok(StaleDisposition::Freeze),
            "retire" => Ok(StaleDisposition::Retire),
            "delete" => Ok(StaleDisposition::Delete),
            other => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_stale_policy")
                .with_message(format!(
                    "unknown stale policy `{}` (expected refresh, freeze, retire or delete)",
                    other
                ))),
        }
    }
}

/// Decides the disposition of each stale pair.
pub trait StalePolicy {
    fn disposition(&self, pair: &Pair) -> StaleDisposition;
}

/// A bare disposition applies uniformly to every stale pair.
impl StalePolicy for StaleDisposition {
    fn disposition(&self, _pair: &Pair) -> StaleDisposition {
        *self
    }
}

/// Per child-type dispositions with a fallback.
///
/// ```
/// use grcsnap_core::model::{Pair, Stub};
/// use grcsnap_core::policy::{SelectedStalePolicy, StaleDisposition, StalePolicy};
///
/// let policy = SelectedStalePolicy::new(StaleDisposition::Refresh)
///     .with_type("Risk", StaleDisposition::Retire);
/// let pair = Pair::new(Stub::new("Audit", 1), Stub::new("Risk", 4));
/// assert_eq!(policy.disposition(&pair), StaleDisposition::Retire);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectedStalePolicy {
    fallback: StaleDisposition,
    by_child_type: BTreeMap<String, StaleDisposition>,
}

impl SelectedStalePolicy {
    pub fn new(fallback: StaleDisposition) -> Self {
        Self {
            fallback,
            by_child_type: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, child_type: impl Into<String>, disposition: StaleDisposition) -> Self {
        self.by_child_type.insert(child_type.into(), disposition);
        self
    }
}

impl StalePolicy for SelectedStalePolicy {
    fn disposition(&self, pair: &Pair) -> StaleDisposition {
        self.by_child_type
            .get(&pair.child.object_type)
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Stale pairs grouped by disposition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StalePlan {
    pub refresh: BTreeSet<Pair>,
    pub freeze: BTreeSet<Pair>,
    pub retire: BTreeSet<Pair>,
    pub delete: BTreeSet<Pair>,
}

impl StalePlan {
    pub fn from_diff(diff: &ScopeDiff, policy: &dyn StalePolicy) -> Self {
        let mut plan = StalePlan::default();
        for pair in &diff.stale {
            let bucket = match policy.disposition(pair) {
                StaleDisposition::Refresh => &mut plan.refresh,
                StaleDisposition::Freeze => &mut plan.freeze,
                StaleDisposition::Retire => &mut plan.retire,
                StaleDisposition::Delete => &mut plan.delete,
            };
            bucket.insert(pair.clone());
        }
        plan
    }

    /// Stale pairs that must not be refreshed by `update`
    pub fn withheld(&self) -> BTreeSet<Pair> {
        self.freeze
            .iter()
            .chain(&self.retire)
            .chain(&self.delete)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stub;

    fn pair(child_type: &str, id: i64) -> Pair {
        Pair::new(Stub::new("Audit", 1), Stub::new(child_type, id))
    }

    #[test]
    fn test_uniform_policy() {
        assert_eq!(
            StaleDisposition::Delete.disposition(&pair("Control", 1)),
            StaleDisposition::Delete
        );
    }

    #[test]
    fn test_plan_buckets_and_withheld() {
        let diff = ScopeDiff {
            stale: [pair("Control", 1), pair("Risk", 2), pair("Objective", 3)]
                .into_iter()
                .collect(),
            ..ScopeDiff::default()
        };
        let policy = SelectedStalePolicy::new(StaleDisposition::Refresh)
            .with_type("Risk", StaleDisposition::Retire)
            .with_type("Objective", StaleDisposition::Delete);

        let plan = StalePlan::from_diff(&diff, &policy);

        assert_eq!(plan.refresh.len(), 1);
        assert!(plan.retire.contains(&pair("Risk", 2)));
        assert!(plan.delete.contains(&pair("Objective", 3)));
        assert_eq!(plan.withheld().len(), 2);
    }

    #[test]
    fn test_parse_disposition() {
        assert_eq!("retire".parse::<StaleDisposition>().ok(), Some(StaleDisposition::Retire));
        let err = "purge".parse::<StaleDisposition>().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
