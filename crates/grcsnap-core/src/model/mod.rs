//! Domain model: object identity, scoping pairs and the three persisted
//! row families (snapshots, revisions, relationships).

pub mod event;
pub mod relationship;
pub mod revision;
pub mod snapshot;
pub mod stub;

pub use event::Event;
pub use relationship::Relationship;
pub use revision::{NewRevision, Revision, RevisionAction, RevisionActionError};
pub use snapshot::{NewSnapshot, Snapshot};
pub use stub::{Pair, PairTuple, Stub, StubParseError, SNAPSHOT_TYPE};
