//! Snapshot commands.
//!
//! ## Transaction model
//!
//! Every command takes the SQLite write lock up front (`BEGIN IMMEDIATE`),
//! so concurrent invocations against the same database serialize instead
//! of racing through scope computation and the mirror. On error the
//! transaction is dropped and nothing is committed; dry-run rolls back
//! explicitly.

#![allow(clippy::result_large_err)]

use crate::generator::{PairFilter, PendingEvent, SnapshotGenerator, UpdateResult, UpsertResult};
use grcsnap_core::errors::{ExError, ExErrorKind, Result};
use grcsnap_core::hooks::{AclHook, NoopAclHook, NoopReindexHook, ReindexHook};
use grcsnap_core::model::{Pair, Stub};
use grcsnap_core::policy::{StaleDisposition, StalePolicy};
use grcsnap_core::response::{OperationResponse, RevisionMap};
use grcsnap_core::rules::RuleTable;
use grcsnap_core_types::RequestContext;
use grcsnap_store::errors::sqlite_op;
use grcsnap_store::objects::SqliteObjectDirectory;
use grcsnap_store::snapshot::{fetch_snapshot, list_snapshots};
use grcsnap_store::DEFAULT_BATCH_SIZE;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::time::Instant;

/// Event action recorded when the caller does not name one
pub const DEFAULT_EVENT_ACTION: &str = "BULK";

/// Per-invocation options shared by every snapshot command.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Actor recorded as `modified_by_id` on every row written
    pub user_id: i64,
    /// Compute everything, persist nothing
    pub dry_run: bool,
    pub batch_size: usize,
    /// Action of the event the snapshot revisions are grouped under
    pub event_action: String,
    pub request: RequestContext,
}

impl SnapshotOptions {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            event_action: DEFAULT_EVENT_ACTION.to_string(),
            request: RequestContext::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_event_action(mut self, action: impl Into<String>) -> Self {
        self.event_action = action.into();
        self
    }
}

/// Collaborators notified after a successful write, plus the stale policy.
#[derive(Clone, Copy)]
pub struct Hooks<'a> {
    pub reindex: &'a dyn ReindexHook,
    pub acl: &'a dyn AclHook,
    pub stale_policy: &'a dyn StalePolicy,
}

impl Default for Hooks<'_> {
    fn default() -> Self {
        Self {
            reindex: &NoopReindexHook,
            acl: &NoopAclHook,
            stale_policy: &StaleDisposition::Refresh,
        }
    }
}

impl<'a> Hooks<'a> {
    pub fn with_stale_policy(mut self, policy: &'a dyn StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_reindex(mut self, hook: &'a dyn ReindexHook) -> Self {
        self.reindex = hook;
        self
    }

    pub fn with_acl(mut self, hook: &'a dyn AclHook) -> Self {
        self.acl = hook;
        self
    }
}

/// Take the write lock. Only a busy or locked database is a concurrency
/// failure; anything else is a persistence error.
fn begin<'c>(conn: &'c mut Connection, op: &'static str) -> Result<Transaction<'c>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                ExError::new(ExErrorKind::Concurrency)
                    .with_op(op)
                    .with_message(format!("Failed to acquire write transaction: {}", e))
            }
            _ => sqlite_op(op)(e),
        })
}

fn finish(tx: Transaction<'_>, options: &SnapshotOptions, op: &'static str) -> Result<()> {
    let outcome = if options.dry_run {
        tx.rollback()
    } else {
        tx.commit()
    };
    outcome.map_err(|e| {
        ExError::new(ExErrorKind::Persistence)
            .with_op(op)
            .with_message(e.to_string())
    })
}

fn generator<'a>(
    tx: &'a Transaction<'_>,
    rules: &'a RuleTable,
    objects: &'a SqliteObjectDirectory<'a>,
    options: &SnapshotOptions,
    hooks: &Hooks<'a>,
) -> SnapshotGenerator<'a> {
    SnapshotGenerator::new(tx, rules, objects, options.user_id)
        .with_dry_run(options.dry_run)
        .with_batch_size(options.batch_size)
        .with_stale_policy(hooks.stale_policy)
        .with_reindex_hook(hooks.reindex)
        .with_acl_hook(hooks.acl)
}

/// Event for one command, written only if the command writes rows
fn pending_event<'e>(parents: &'e [Stub], options: &'e SnapshotOptions) -> PendingEvent<'e> {
    let resource = match parents {
        [only] => Some(only),
        _ => None,
    };
    PendingEvent::new(&options.event_action, resource, Some(options.user_id))
}

/// Bracket `body` with the canonical start/end logging and tag any error
/// with the request's correlation ids.
fn instrumented<T>(
    op: &'static str,
    options: &SnapshotOptions,
    parent_count: usize,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    grcsnap_core::log_op_start!(
        op,
        parent_count = parent_count,
        dry_run = options.dry_run,
        request_id = options.request.request_id.as_str()
    );
    match body() {
        Ok(value) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            grcsnap_core::log_op_end!(
                op,
                duration_ms = duration_ms,
                request_id = options.request.request_id.as_str()
            );
            Ok(value)
        }
        Err(e) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let mut err = e.with_request_id(options.request.request_id.clone());
            if let Some(trace_id) = &options.request.trace_id {
                err = err.with_trace_id(trace_id.clone());
            }
            grcsnap_core::log_op_error!(op, &err, duration_ms = duration_ms);
            Err(err)
        }
    }
}

/// Snapshot every in-scope child of `parents` that has no snapshot yet.
#[allow(clippy::too_many_arguments)]
pub fn create_snapshots(
    conn: &mut Connection,
    rules: &RuleTable,
    parents: &[Stub],
    revisions: &RevisionMap,
    filter: Option<PairFilter<'_>>,
    options: &SnapshotOptions,
    hooks: Hooks<'_>,
) -> Result<OperationResponse<BTreeSet<Pair>>> {
    instrumented("create_snapshots", options, parents.len(), || {
        let tx = begin(conn, "create_snapshots")?;
        let response = {
            let objects = SqliteObjectDirectory::new(&tx);
            let mut generator = generator(&tx, rules, &objects, options, &hooks);
            for parent in parents {
                generator.add_parent(parent)?;
            }
            let event = pending_event(parents, options);
            generator.create(&event, revisions, filter)?
        };
        finish(tx, options, "create_snapshots")?;
        Ok(response)
    })
}

/// Bring every snapshot of `parents` up to date and snapshot new children.
#[allow(clippy::too_many_arguments)]
pub fn upsert_snapshots(
    conn: &mut Connection,
    rules: &RuleTable,
    parents: &[Stub],
    revisions: &RevisionMap,
    filter: Option<PairFilter<'_>>,
    options: &SnapshotOptions,
    hooks: Hooks<'_>,
) -> Result<OperationResponse<UpsertResult>> {
    instrumented("upsert_snapshots", options, parents.len(), || {
        let tx = begin(conn, "upsert_snapshots")?;
        let response = {
            let objects = SqliteObjectDirectory::new(&tx);
            let mut generator = generator(&tx, rules, &objects, options, &hooks);
            for parent in parents {
                generator.add_parent(parent)?;
            }
            let event = pending_event(parents, options);
            generator.upsert(&event, revisions, filter)?
        };
        finish(tx, options, "upsert_snapshots")?;
        Ok(response)
    })
}

/// Copy the live snapshot set of `base` onto `target` at the same revisions.
pub fn clone_scope(
    conn: &mut Connection,
    base: &Stub,
    target: &Stub,
    options: &SnapshotOptions,
    hooks: Hooks<'_>,
) -> Result<OperationResponse<BTreeSet<Pair>>> {
    instrumented("clone_scope", options, 1, || {
        if base == target {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("clone_scope")
                .with_entity_id(base.to_string())
                .with_message("Cannot clone a scope onto itself"));
        }
        let tx = begin(conn, "clone_scope")?;
        let response = {
            let source: Vec<_> = list_snapshots(&tx, base)?
                .into_iter()
                .filter(|snapshot| !snapshot.is_retired())
                .collect();
            let revisions: RevisionMap = source
                .iter()
                .map(|snapshot| {
                    (
                        Pair::new(target.clone(), snapshot.child()),
                        snapshot.revision_id,
                    )
                })
                .collect();
            tracing::debug!(
                parent = %base,
                pair_count = source.len(),
                "Cloning snapshot scope"
            );

            let rules = RuleTable::new();
            let objects = SqliteObjectDirectory::new(&tx);
            let mut generator = generator(&tx, &rules, &objects, options, &hooks);
            generator.add_family(target, source.iter().map(|snapshot| snapshot.child()))?;
            let event = pending_event(std::slice::from_ref(target), options);
            generator.create(&event, &revisions, None)?
        };
        finish(tx, options, "clone_scope")?;
        Ok(response)
    })
}

/// Move one snapshot to its child's newest snapshottable revision.
///
/// ## Errors
///
/// - `ExErrorKind::NotFound`: no snapshot with that id
pub fn refresh_snapshot(
    conn: &mut Connection,
    snapshot_id: i64,
    options: &SnapshotOptions,
    hooks: Hooks<'_>,
) -> Result<OperationResponse<UpdateResult>> {
    instrumented("refresh_snapshot", options, 1, || {
        let tx = begin(conn, "refresh_snapshot")?;
        let response = {
            let snapshot = fetch_snapshot(&tx, snapshot_id)?;
            let target = snapshot.pair();
            let only_target: PairFilter<'_> = &|pair: &Pair| pair == &target;

            let rules = RuleTable::new();
            let objects = SqliteObjectDirectory::new(&tx);
            let mut generator = generator(&tx, &rules, &objects, options, &hooks);
            generator.add_family(&target.parent, [target.child.clone()])?;
            let event = pending_event(std::slice::from_ref(&target.parent), options);
            generator.update(&event, &RevisionMap::new(), Some(only_target))?
        };
        finish(tx, options, "refresh_snapshot")?;
        Ok(response)
    })
}
