//! Snapshot commands
//!
//! Thin wrappers over `apply_engine_command`; every result is printed as the
//! JSON operation envelope on stdout.

use super::settings;
use clap::{Args, Subcommand};
use grcsnap_core::model::{Pair, Stub};
use grcsnap_core::policy::StaleDisposition;
use grcsnap_core::{RevisionMap, RuleTable};
use grcsnap_engine::commands::engine_command::{apply_engine_command, EngineCommand};
use grcsnap_engine::commands::snapshot::{Hooks, SnapshotOptions, DEFAULT_EVENT_ACTION};
use grcsnap_store::config::{validate_config, SnapshotterConfig};
use grcsnap_store::rules_file::load_rules_file;
use grcsnap_store::snapshot::{list_snapshot_relationships, list_snapshots};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Create snapshots for every in-scope child that has none yet
    Create(ScopeArgs),
    /// Create, refresh and reconcile snapshots for the given parents
    Upsert(ScopeArgs),
    /// Copy another parent's snapshots, pinned to their revisions
    Clone(CloneArgs),
    /// Move a single snapshot to its child's latest revision
    Refresh(RefreshArgs),
    /// List the snapshots held by a parent
    List(ListArgs),
}

/// Flags shared by every writing command.
#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Database path (overrides the config file)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Acting user recorded on every written row
    #[arg(long)]
    pub user: i64,

    /// Compute and report without persisting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Rows per statement (overrides the config file)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Action recorded on the operation's event
    #[arg(long, default_value = DEFAULT_EVENT_ACTION)]
    pub event_action: String,

    /// What to do with snapshots whose child left the scope
    #[arg(long)]
    pub stale_policy: Option<StaleDisposition>,
}

#[derive(Debug, Args)]
pub struct ScopeArgs {
    #[command(flatten)]
    pub write: WriteArgs,

    /// Rule table (overrides the config file)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Parent object as `Type:id`; repeatable
    #[arg(long = "parent", required = true)]
    pub parents: Vec<Stub>,

    /// Pin a pair to a revision: `Parent:id/Child:id=revision_id`; repeatable
    #[arg(long = "revision", value_parser = parse_revision_pin)]
    pub revisions: Vec<(Pair, i64)>,

    /// Only act on pairs with this object on either side
    #[arg(long)]
    pub focus: Option<Stub>,
}

#[derive(Debug, Args)]
pub struct CloneArgs {
    #[command(flatten)]
    pub write: WriteArgs,

    /// Parent whose snapshots are copied
    #[arg(long)]
    pub base: Stub,

    /// Parent receiving the copies
    #[arg(long)]
    pub target: Stub,
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub write: WriteArgs,

    #[arg(long)]
    pub snapshot_id: i64,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Database path (overrides the config file)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Parent object as `Type:id`
    #[arg(long)]
    pub parent: Stub,

    /// Print snapshot-to-snapshot relationships instead of snapshots
    #[arg(long)]
    pub relationships: bool,
}

fn parse_revision_pin(raw: &str) -> Result<(Pair, i64), String> {
    let (pair, revision) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `Parent:id/Child:id=revision_id`, got `{}`", raw))?;
    let (parent, child) = pair
        .split_once('/')
        .ok_or_else(|| format!("expected `Parent:id/Child:id` before `=`, got `{}`", pair))?;
    let parent: Stub = parent.parse().map_err(|e| format!("{}", e))?;
    let child: Stub = child.parse().map_err(|e| format!("{}", e))?;
    let revision = revision
        .parse::<i64>()
        .map_err(|_| format!("revision id must be an integer, got `{}`", revision))?;
    Ok((Pair::new(parent, child), revision))
}

/// Command options, with `--batch-size` held to the same bounds as the
/// config file
fn options(
    config: &SnapshotterConfig,
    args: &WriteArgs,
) -> Result<SnapshotOptions, Box<dyn std::error::Error>> {
    let mut effective = config.clone();
    if let Some(batch_size) = args.batch_size {
        effective.batch_size = batch_size;
        validate_config(&effective)?;
    }
    Ok(SnapshotOptions::new(args.user)
        .with_dry_run(args.dry_run)
        .with_batch_size(effective.batch_size)
        .with_event_action(args.event_action.clone()))
}

pub fn execute(config_path: &Path, args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings::load(config_path)?;

    let (write, rules_path, cmd) = match args.command {
        SnapshotCommand::List(list) => return execute_list(&config, list),
        SnapshotCommand::Create(scope) => {
            let options = options(&config, &scope.write)?;
            let revisions: RevisionMap = scope.revisions.into_iter().collect();
            let cmd = EngineCommand::CreateSnapshots {
                parents: scope.parents,
                revisions,
                focus: scope.focus,
                options,
            };
            (scope.write, scope.rules, cmd)
        }
        SnapshotCommand::Upsert(scope) => {
            let options = options(&config, &scope.write)?;
            let revisions: RevisionMap = scope.revisions.into_iter().collect();
            let cmd = EngineCommand::UpsertSnapshots {
                parents: scope.parents,
                revisions,
                focus: scope.focus,
                options,
            };
            (scope.write, scope.rules, cmd)
        }
        SnapshotCommand::Clone(clone) => {
            let cmd = EngineCommand::CloneScope {
                base: clone.base,
                target: clone.target,
                options: options(&config, &clone.write)?,
            };
            (clone.write, None, cmd)
        }
        SnapshotCommand::Refresh(refresh) => {
            let cmd = EngineCommand::RefreshSnapshot {
                snapshot_id: refresh.snapshot_id,
                options: options(&config, &refresh.write)?,
            };
            (refresh.write, None, cmd)
        }
    };

    // Clone and refresh never compute scope, so they run without a rule table.
    let rules = match (&cmd, rules_path) {
        (EngineCommand::CloneScope { .. } | EngineCommand::RefreshSnapshot { .. }, _) => {
            RuleTable::new()
        }
        (_, Some(path)) => load_rules_file(&path)?,
        (_, None) => load_rules_file(&config.rules)?,
    };

    let stale_policy = write.stale_policy.unwrap_or(config.stale_policy);
    let hooks = Hooks::default().with_stale_policy(&stale_policy);

    let mut conn = settings::open_store(&config, write.db.as_ref())?;
    let result = apply_engine_command(cmd, &mut conn, &rules, hooks)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn execute_list(config: &SnapshotterConfig, args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let conn = settings::open_store(config, args.db.as_ref())?;
    let json = if args.relationships {
        serde_json::to_string_pretty(&list_snapshot_relationships(&conn, &args.parent)?)?
    } else {
        serde_json::to_string_pretty(&list_snapshots(&conn, &args.parent)?)?
    };
    println!("{}", json);
    Ok(())
}
