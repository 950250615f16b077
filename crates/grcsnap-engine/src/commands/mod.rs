//! Command orchestration layer.
//!
//! Each command opens one IMMEDIATE transaction, runs a `SnapshotGenerator`
//! inside it, and commits only when the pass succeeded outside dry-run.

pub mod engine_command;
pub mod snapshot;
