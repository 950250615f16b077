//! Revision history and the revision resolver.

pub mod history;
pub mod resolver;

pub use history::{append_revision, fetch_revision, insert_revisions, list_revisions};
pub use resolver::{resolve_revisions, ResolvedRevisions};
