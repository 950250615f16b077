//! grcsnap store - SQLite persistence for the snapshotter
//!
//! Provides:
//! - Schema migrations with checksums
//! - Configuration and rule table file loading
//! - The object directory, events, revision history and relationships
//! - The revision resolver and the two-hop scope calculator
//! - Bulk snapshot persistence and the relationship mirror

pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod migrations;
pub mod mirror;
pub mod objects;
pub mod relationships;
pub mod revision;
pub mod rules_file;
pub mod scope;
pub mod snapshot;
mod sql;

pub use errors::Result;
pub use sql::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
