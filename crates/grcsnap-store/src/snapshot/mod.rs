//! Snapshot rows: bulk persistence and queries.
//!
//! Snapshot rows are written only through `persist`; everything else reads.

pub mod persist;
pub mod query;

pub use persist::{
    delete_snapshots, insert_snapshots, retire_snapshots, update_snapshot_revisions,
    write_snapshot_revisions, RevisionUpdate,
};
pub use query::{
    fetch_snapshot, find_snapshot, find_snapshots, list_parent_links, list_snapshot_relationships,
    list_snapshots, list_snapshots_for_parents,
};

/// Column list shared by every statement that reads snapshot rows back
pub(crate) const SNAPSHOT_COLUMNS: &str = "id, parent_type, parent_id, child_type, child_id, \
     revision_id, context_id, modified_by_id, created_at, updated_at, retired_at";

pub(crate) fn snapshot_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<grcsnap_core::model::Snapshot> {
    Ok(grcsnap_core::model::Snapshot {
        id: row.get(0)?,
        parent_type: row.get(1)?,
        parent_id: row.get(2)?,
        child_type: row.get(3)?,
        child_id: row.get(4)?,
        revision_id: row.get(5)?,
        context_id: row.get(6)?,
        modified_by_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        retired_at: row.get(10)?,
    })
}
