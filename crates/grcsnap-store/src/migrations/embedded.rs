//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_object_graph",
            sql: include_str!("../../migrations/001_object_graph.sql"),
        },
        Migration {
            id: "002_revision_history",
            sql: include_str!("../../migrations/002_revision_history.sql"),
        },
        Migration {
            id: "003_snapshots",
            sql: include_str!("../../migrations/003_snapshots.sql"),
        },
        Migration {
            id: "004_snapshot_retirement",
            sql: include_str!("../../migrations/004_snapshot_retirement.sql"),
        },
    ]
}
