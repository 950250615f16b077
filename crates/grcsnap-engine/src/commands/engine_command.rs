//! Engine-level commands for callers that dispatch on data (the CLI, cron).

#![allow(clippy::result_large_err)]

use crate::commands::snapshot::{
    clone_scope, create_snapshots, refresh_snapshot, upsert_snapshots, Hooks, SnapshotOptions,
};
use crate::generator::{UpdateResult, UpsertResult};
use grcsnap_core::errors::Result;
use grcsnap_core::model::{Pair, Stub};
use grcsnap_core::response::{OperationResponse, RevisionMap};
use grcsnap_core::rules::RuleTable;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;

/// Snapshot commands that touch the database.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    CreateSnapshots {
        parents: Vec<Stub>,
        revisions: RevisionMap,
        /// Restrict the pass to pairs with this object on either side
        focus: Option<Stub>,
        options: SnapshotOptions,
    },
    UpsertSnapshots {
        parents: Vec<Stub>,
        revisions: RevisionMap,
        focus: Option<Stub>,
        options: SnapshotOptions,
    },
    CloneScope {
        base: Stub,
        target: Stub,
        options: SnapshotOptions,
    },
    RefreshSnapshot {
        snapshot_id: i64,
        options: SnapshotOptions,
    },
}

/// Result of applying an engine command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EngineCommandResult {
    Created(OperationResponse<BTreeSet<Pair>>),
    Upserted(OperationResponse<UpsertResult>),
    Cloned(OperationResponse<BTreeSet<Pair>>),
    Refreshed(OperationResponse<UpdateResult>),
}

fn touches(focus: &Stub, pair: &Pair) -> bool {
    &pair.parent == focus || &pair.child == focus
}

/// Apply an engine command.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    rules: &RuleTable,
    hooks: Hooks<'_>,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::CreateSnapshots {
            parents,
            revisions,
            focus,
            options,
        } => {
            let filter = focus.map(|stub| move |pair: &Pair| touches(&stub, pair));
            create_snapshots(
                conn,
                rules,
                &parents,
                &revisions,
                filter.as_ref().map(|f| f as &dyn Fn(&Pair) -> bool),
                &options,
                hooks,
            )
            .map(EngineCommandResult::Created)
        }
        EngineCommand::UpsertSnapshots {
            parents,
            revisions,
            focus,
            options,
        } => {
            let filter = focus.map(|stub| move |pair: &Pair| touches(&stub, pair));
            upsert_snapshots(
                conn,
                rules,
                &parents,
                &revisions,
                filter.as_ref().map(|f| f as &dyn Fn(&Pair) -> bool),
                &options,
                hooks,
            )
            .map(EngineCommandResult::Upserted)
        }
        EngineCommand::CloneScope {
            base,
            target,
            options,
        } => clone_scope(conn, &base, &target, &options, hooks).map(EngineCommandResult::Cloned),
        EngineCommand::RefreshSnapshot {
            snapshot_id,
            options,
        } => refresh_snapshot(conn, snapshot_id, &options, hooks)
            .map(EngineCommandResult::Refreshed),
    }
}
