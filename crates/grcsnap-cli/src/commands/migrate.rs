//! Schema migration command

use super::settings;
use clap::Args;
use grcsnap_store::migrations::current_schema_version;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Database path (overrides the config file)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub fn execute(config_path: &Path, args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings::load(config_path)?;
    let conn = settings::open_store(&config, args.db.as_ref())?;
    match current_schema_version(&conn)? {
        Some(version) => println!("Schema version: {}", version),
        None => println!("Schema version: none"),
    }
    Ok(())
}
