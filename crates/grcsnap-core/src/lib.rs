//! grcsnap core - pure domain layer of the snapshotter
//!
//! This crate holds everything that does not touch the database:
//! - Object identity (`Stub`, `Pair`) and the persisted row models
//! - The scoping rule table (`NeighborRule`, `ScopingRule`, `RuleTable`)
//! - Scope reconciliation (`ScopeDiff`) and the stale snapshot policy
//! - Collaborator traits and the operation response envelope
//! - The error and logging facilities shared by every crate

pub mod diff;
pub mod errors;
pub mod hooks;
pub mod logging_facility;
pub mod model;
pub mod policy;
pub mod response;
pub mod rules;

/// Re-exported so the logging macros resolve without a direct dependency
pub use grcsnap_core_types as core_types;

pub use diff::ScopeDiff;
pub use errors::{ExError, ExErrorKind, Result};
pub use model::{Pair, Stub};
pub use policy::{StaleDisposition, StalePolicy};
pub use response::{OperationResponse, RevisionMap};
pub use rules::{NeighborRule, RuleTable, ScopingRule};
