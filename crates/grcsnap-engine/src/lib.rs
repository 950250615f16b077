//! grcsnap engine - orchestration layer
//!
//! The `SnapshotGenerator` reconciles each parent's computed scope against
//! its persisted snapshots; the command functions wrap it in a transaction
//! and the canonical operation logging.

pub mod commands;
pub mod generator;

pub use generator::{PairFilter, PendingEvent, SnapshotGenerator, UpdateResult, UpsertResult};
