//! grcsnap CLI
//!
//! Command-line entry point for snapshot maintenance jobs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "grcsnap")]
#[command(about = "grcsnap - scoped, versioned snapshots of related objects", long_about = None)]
struct Cli {
    /// Configuration file; a missing file means defaults
    #[arg(long, global = true, default_value = "grcsnap.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply schema migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Snapshot operations
    Snapshot(commands::snapshot::SnapshotArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(&cli.config, args),
        Commands::Snapshot(args) => commands::snapshot::execute(&cli.config, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
