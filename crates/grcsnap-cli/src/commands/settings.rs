//! Configuration shared by every command: file values, then flag overrides

use grcsnap_core::logging_facility;
use grcsnap_store::config::{load_config, SnapshotterConfig};
use grcsnap_store::db;
use grcsnap_store::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Load the config file and start logging with its profile
pub fn load(config_path: &Path) -> Result<SnapshotterConfig, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    logging_facility::init(config.log_profile);
    Ok(config)
}

/// Open the database named by `--db`, or by the config, and migrate it
pub fn open_store(
    config: &SnapshotterConfig,
    db_override: Option<&PathBuf>,
) -> Result<Connection, Box<dyn std::error::Error>> {
    let path = db_override.unwrap_or(&config.database);
    let mut conn = db::open(path)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
