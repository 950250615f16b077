//! Collaborator seams.
//!
//! The snapshotter reads parent objects through `ObjectResolver` and
//! notifies two downstream systems after a successful write: full-text
//! re-indexing (`ReindexHook`) and access-control propagation (`AclHook`).

use crate::errors::Result;
use crate::model::{Pair, Stub};
use std::collections::BTreeSet;

/// Read access to the generic object model.
pub trait ObjectResolver {
    /// Context id of an object, `None` when it has none (or does not exist)
    fn context_id(&self, object: &Stub) -> Result<Option<i64>>;

    /// Follow a direct attribute of `object` to the object it references
    fn attribute(&self, object: &Stub, name: &str) -> Result<Option<Stub>>;
}

/// Re-index the given snapshot pairs.
pub trait ReindexHook {
    fn reindex(&self, pairs: &BTreeSet<Pair>) -> Result<()>;
}

/// Propagate access control over newly created relationships.
pub trait AclHook {
    fn relationships_created(&self, relationship_ids: &[i64]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReindexHook;

impl ReindexHook for NoopReindexHook {
    fn reindex(&self, _pairs: &BTreeSet<Pair>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAclHook;

impl AclHook for NoopAclHook {
    fn relationships_created(&self, _relationship_ids: &[i64]) -> Result<()> {
        Ok(())
    }
}
