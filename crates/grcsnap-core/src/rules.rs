//! Scoping rule table.
//!
//! For every parent object type the table names its first-order
//! neighborhood (`fst`) and, for every object type that can appear in a
//! first-order neighborhood, the object types allowed one relationship hop
//! further out (`snd`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One entry of a rule's first-order neighborhood.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawNeighborRule", into = "RawNeighborRule")]
pub enum NeighborRule {
    /// Objects of this type linked to the parent through the relationship graph
    Relation(String),
    /// The object referenced by this attribute of the parent
    Attribute(String),
    /// Entry of a kind this build does not know; matches nothing
    Unrecognized { kind: String, name: String },
}

impl NeighborRule {
    pub fn relation(object_type: impl Into<String>) -> Self {
        NeighborRule::Relation(object_type.into())
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        NeighborRule::Attribute(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            NeighborRule::Relation(name)
            | NeighborRule::Attribute(name)
            | NeighborRule::Unrecognized { name, .. } => name,
        }
    }
}

/// Wire form of a neighbor rule: `{ kind: relation|attribute, name: ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNeighborRule {
    kind: String,
    name: String,
}

impl From<RawNeighborRule> for NeighborRule {
    fn from(raw: RawNeighborRule) -> Self {
        match raw.kind.as_str() {
            "relation" => NeighborRule::Relation(raw.name),
            "attribute" => NeighborRule::Attribute(raw.name),
            _ => NeighborRule::Unrecognized {
                kind: raw.kind,
                name: raw.name,
            },
        }
    }
}

impl From<NeighborRule> for RawNeighborRule {
    fn from(rule: NeighborRule) -> Self {
        match rule {
            NeighborRule::Relation(name) => RawNeighborRule {
                kind: "relation".to_string(),
                name,
            },
            NeighborRule::Attribute(name) => RawNeighborRule {
                kind: "attribute".to_string(),
                name,
            },
            NeighborRule::Unrecognized { kind, name } => RawNeighborRule { kind, name },
        }
    }
}

/// Rule record for one object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopingRule {
    #[serde(default)]
    pub fst: BTreeSet<NeighborRule>,
    #[serde(default)]
    pub snd: BTreeSet<String>,
}

impl ScopingRule {
    pub fn new(
        fst: impl IntoIterator<Item = NeighborRule>,
        snd: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            fst: fst.into_iter().collect(),
            snd: snd.into_iter().map(Into::into).collect(),
        }
    }

    /// Rule with only a first-order neighborhood
    pub fn first_order(fst: impl IntoIterator<Item = NeighborRule>) -> Self {
        Self {
            fst: fst.into_iter().collect(),
            snd: BTreeSet::new(),
        }
    }

    /// Rule with only a second-order type set
    pub fn second_order(snd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fst: BTreeSet::new(),
            snd: snd.into_iter().map(Into::into).collect(),
        }
    }

    /// Object types reached through the relationship graph
    pub fn relation_types(&self) -> BTreeSet<&str> {
        self.fst
            .iter()
            .filter_map(|rule| match rule {
                NeighborRule::Relation(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Attribute names dereferenced on the parent
    pub fn attributes(&self) -> BTreeSet<&str> {
        self.fst
            .iter()
            .filter_map(|rule| match rule {
                NeighborRule::Attribute(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn unrecognized(&self) -> impl Iterator<Item = &NeighborRule> {
        self.fst
            .iter()
            .filter(|rule| matches!(rule, NeighborRule::Unrecognized { .. }))
    }
}

/// Static lookup from object type to its scoping rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: BTreeMap<String, ScopingRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, object_type: impl Into<String>, rule: ScopingRule) -> Self {
        self.insert(object_type, rule);
        self
    }

    pub fn insert(&mut self, object_type: impl Into<String>, rule: ScopingRule) {
        self.rules.insert(object_type.into(), rule);
    }

    pub fn get(&self, object_type: &str) -> Option<&ScopingRule> {
        self.rules.get(object_type)
    }

    /// Second-order types for `object_type`; `None` when it has no rule or
    /// the rule's `snd` is empty (second-order lookup is skipped).
    pub fn snd_for(&self, object_type: &str) -> Option<&BTreeSet<String>> {
        self.rules
            .get(object_type)
            .map(|rule| &rule.snd)
            .filter(|snd| !snd.is_empty())
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
