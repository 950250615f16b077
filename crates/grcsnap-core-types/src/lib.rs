//! Core types shared across grcsnap facilities
//!
//! This crate provides the small set of primitives that both the error
//! facility and the logging facility depend on:
//!
//! - **Correlation types**: RequestId, TraceId, RequestContext
//! - **Schema constants**: canonical log field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
