//! Canonical schema constants for structured logging
//!
//! Every snapshotter log line uses these keys so operators can filter on a
//! stable vocabulary regardless of which crate emitted the event.

// Envelope
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_PARENT: &str = "parent";
pub const FIELD_CHILD: &str = "child";
pub const FIELD_SNAPSHOT_ID: &str = "snapshot_id";
pub const FIELD_EVENT_ID: &str = "event_id";

// Collection sizes
pub const FIELD_PARENT_COUNT: &str = "parent_count";
pub const FIELD_PAIR_COUNT: &str = "pair_count";
pub const FIELD_MISSED_COUNT: &str = "missed_count";
pub const FIELD_ROWS_AFFECTED: &str = "rows_affected";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
