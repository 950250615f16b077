//! Snapshot generator
//!
//! Request-scoped orchestrator: holds the parents being processed, the
//! desired child set of each, and each parent's context id (captured once,
//! the first time the parent is seen). Every computation runs in dry-run
//! mode too; only the writes are suppressed.
//!
//! Write order within one pass: stale dispositions, then updates, then
//! inserts, then the relationship mirror, then the ACL and re-index hooks.

use chrono::Utc;
use grcsnap_core::diff::ScopeDiff;
use grcsnap_core::errors::Result;
use grcsnap_core::hooks::{AclHook, NoopAclHook, NoopReindexHook, ObjectResolver, ReindexHook};
use grcsnap_core::model::{Event, NewSnapshot, Pair, RevisionAction, Snapshot, Stub};
use grcsnap_core::policy::{StaleDisposition, StalePlan, StalePolicy};
use grcsnap_core::response::{MirrorCounts, OperationExtra, OperationResponse, RevisionMap};
use grcsnap_core::rules::RuleTable;
use grcsnap_store::events::create_event;
use grcsnap_store::mirror::mirror;
use grcsnap_store::revision::{resolve_revisions, ResolvedRevisions};
use grcsnap_store::scope::ScopeCalculator;
use grcsnap_store::snapshot::{
    delete_snapshots, insert_snapshots, list_snapshots_for_parents, retire_snapshots,
    update_snapshot_revisions, write_snapshot_revisions, RevisionUpdate,
};
use grcsnap_store::DEFAULT_BATCH_SIZE;
use rusqlite::Connection;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

/// Restricts a pass to the pairs it accepts
pub type PairFilter<'f> = &'f dyn Fn(&Pair) -> bool;

/// Pairs mutated by an update pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub updated: BTreeSet<Pair>,
    pub retired: BTreeSet<Pair>,
    pub deleted: BTreeSet<Pair>,
}

impl UpdateResult {
    fn touched(&self) -> BTreeSet<Pair> {
        self.updated
            .iter()
            .chain(&self.retired)
            .chain(&self.deleted)
            .cloned()
            .collect()
    }
}

/// Pairs mutated by an upsert pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertResult {
    pub create: BTreeSet<Pair>,
    pub update: BTreeSet<Pair>,
    pub retired: BTreeSet<Pair>,
    pub deleted: BTreeSet<Pair>,
}

impl UpsertResult {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update.is_empty()
            && self.retired.is_empty()
            && self.deleted.is_empty()
    }
}

/// The event a pass tags its snapshot revisions with.
///
/// The row is inserted on the first write, so a pass that changes nothing
/// leaves the events table untouched.
pub struct PendingEvent<'e> {
    action: &'e str,
    resource: Option<&'e Stub>,
    modified_by_id: Option<i64>,
    opened: OnceCell<Event>,
}

impl<'e> PendingEvent<'e> {
    pub fn new(action: &'e str, resource: Option<&'e Stub>, modified_by_id: Option<i64>) -> Self {
        Self {
            action,
            resource,
            modified_by_id,
            opened: OnceCell::new(),
        }
    }

    /// Tag writes with an event the caller already persisted
    pub fn existing(event: Event) -> Self {
        Self {
            action: "",
            resource: None,
            modified_by_id: event.modified_by_id,
            opened: OnceCell::from(event),
        }
    }

    /// The event row, if any write has needed it
    pub fn opened(&self) -> Option<&Event> {
        self.opened.get()
    }

    fn id(&self, conn: &Connection) -> Result<i64> {
        if let Some(event) = self.opened.get() {
            return Ok(event.id);
        }
        let event = create_event(conn, self.action, self.resource, self.modified_by_id)?;
        Ok(self.opened.get_or_init(|| event).id)
    }
}

pub struct SnapshotGenerator<'a> {
    conn: &'a Connection,
    rules: &'a RuleTable,
    objects: &'a dyn ObjectResolver,
    reindex: &'a dyn ReindexHook,
    acl: &'a dyn AclHook,
    stale_policy: &'a dyn StalePolicy,
    user_id: i64,
    dry_run: bool,
    batch_size: usize,
    desired: BTreeMap<Stub, BTreeSet<Stub>>,
    contexts: BTreeMap<Stub, Option<i64>>,
}

impl<'a> SnapshotGenerator<'a> {
    pub fn new(
        conn: &'a Connection,
        rules: &'a RuleTable,
        objects: &'a dyn ObjectResolver,
        user_id: i64,
    ) -> Self {
        Self {
            conn,
            rules,
            objects,
            reindex: &NoopReindexHook,
            acl: &NoopAclHook,
            stale_policy: &StaleDisposition::Refresh,
            user_id,
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            desired: BTreeMap::new(),
            contexts: BTreeMap::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_stale_policy(mut self, policy: &'a dyn StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_reindex_hook(mut self, hook: &'a dyn ReindexHook) -> Self {
        self.reindex = hook;
        self
    }

    pub fn with_acl_hook(mut self, hook: &'a dyn AclHook) -> Self {
        self.acl = hook;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn parents(&self) -> impl Iterator<Item = &Stub> {
        self.desired.keys()
    }

    /// Add `parent` to the working set with its computed scope.
    pub fn add_parent(&mut self, parent: &Stub) -> Result<&BTreeSet<Stub>> {
        self.context_of(parent)?;
        let scope = ScopeCalculator::new(self.conn, self.rules, self.objects, self.batch_size)
            .scope(parent)?;
        let entry = self.desired.entry(parent.clone()).or_default();
        entry.extend(scope);
        Ok(entry)
    }

    /// Add `parent` with an explicit child set instead of a computed scope.
    pub fn add_family(
        &mut self,
        parent: &Stub,
        children: impl IntoIterator<Item = Stub>,
    ) -> Result<()> {
        self.context_of(parent)?;
        let entry = self.desired.entry(parent.clone()).or_default();
        entry.extend(
            children
                .into_iter()
                .filter(|child| child != parent && !child.is_snapshot()),
        );
        Ok(())
    }

    fn context_of(&mut self, parent: &Stub) -> Result<Option<i64>> {
        if let Some(context_id) = self.contexts.get(parent) {
            return Ok(*context_id);
        }
        let context_id = self.objects.context_id(parent)?;
        self.contexts.insert(parent.clone(), context_id);
        Ok(context_id)
    }

    pub fn desired_pairs(&self) -> BTreeSet<Pair> {
        self.desired
            .iter()
            .flat_map(|(parent, children)| {
                children
                    .iter()
                    .map(move |child| Pair::new(parent.clone(), child.clone()))
            })
            .collect()
    }

    fn existing(&self) -> Result<BTreeMap<Pair, Snapshot>> {
        let parents: Vec<&Stub> = self.desired.keys().collect();
        Ok(list_snapshots_for_parents(self.conn, &parents, self.batch_size)?
            .into_iter()
            .map(|snapshot| (snapshot.pair(), snapshot))
            .collect())
    }

    /// Split desired and persisted pairs into keep / stale / new
    pub fn analyze(&self) -> Result<ScopeDiff> {
        Ok(self.analyze_with(None)?.0)
    }

    fn analyze_with(
        &self,
        filter: Option<PairFilter<'_>>,
    ) -> Result<(ScopeDiff, BTreeMap<Pair, Snapshot>)> {
        let existing = self.existing()?;
        let persisted: BTreeSet<Pair> = existing.keys().cloned().collect();
        let mut diff = ScopeDiff::compute(&self.desired_pairs(), &persisted);
        if let Some(accept) = filter {
            diff.keep.retain(|pair| accept(pair));
            diff.stale.retain(|pair| accept(pair));
            diff.new.retain(|pair| accept(pair));
        }
        tracing::debug!(
            keep = diff.keep.len(),
            stale = diff.stale.len(),
            new = diff.new.len(),
            "Analyzed scope"
        );
        Ok((diff, existing))
    }

    /// Snapshot every in-scope pair that has no snapshot yet.
    pub fn create(
        &self,
        event: &PendingEvent<'_>,
        revisions: &RevisionMap,
        filter: Option<PairFilter<'_>>,
    ) -> Result<OperationResponse<BTreeSet<Pair>>> {
        let (diff, _) = self.analyze_with(filter)?;
        let (created, resolved) = self.create_pairs(&diff.for_create(), event, revisions)?;
        let mirror = self.finish(&created, !created.is_empty())?;
        let extra = self.extra(resolved, mirror);
        Ok(OperationResponse::new("create", created, extra))
    }

    /// Move persisted snapshots to their target revisions, applying the
    /// stale policy to snapshots whose child left the scope.
    pub fn update(
        &self,
        event: &PendingEvent<'_>,
        revisions: &RevisionMap,
        filter: Option<PairFilter<'_>>,
    ) -> Result<OperationResponse<UpdateResult>> {
        let (diff, existing) = self.analyze_with(filter)?;
        let (result, resolved) = self.update_pairs(&diff, &existing, event, revisions)?;
        let touched = result.touched();
        let mirror = self.finish(&touched, !touched.is_empty())?;
        let extra = self.extra(resolved, mirror);
        Ok(OperationResponse::new("update", result, extra))
    }

    /// Update, then create, then mirror relationships.
    pub fn upsert(
        &self,
        event: &PendingEvent<'_>,
        revisions: &RevisionMap,
        filter: Option<PairFilter<'_>>,
    ) -> Result<OperationResponse<UpsertResult>> {
        let (diff, existing) = self.analyze_with(filter)?;
        let (updated, mut resolved) = self.update_pairs(&diff, &existing, event, revisions)?;
        let (created, created_resolved) =
            self.create_pairs(&diff.for_create(), event, revisions)?;
        resolved.revisions.extend(created_resolved.revisions);
        resolved.missed.extend(created_resolved.missed);

        let mut touched = updated.touched();
        touched.extend(created.iter().cloned());
        let mirror = self.finish(&touched, true)?;

        let result = UpsertResult {
            create: created,
            update: updated.updated,
            retired: updated.retired,
            deleted: updated.deleted,
        };
        tracing::info!(
            created = result.create.len(),
            updated = result.update.len(),
            retired = result.retired.len(),
            deleted = result.deleted.len(),
            missed_count = resolved.missed.len(),
            dry_run = self.dry_run,
            "Upserted snapshots"
        );
        let extra = self.extra(resolved, mirror);
        Ok(OperationResponse::new("upsert", result, extra))
    }

    fn create_pairs(
        &self,
        pairs: &BTreeSet<Pair>,
        event: &PendingEvent<'_>,
        revisions: &RevisionMap,
    ) -> Result<(BTreeSet<Pair>, ResolvedRevisions)> {
        let resolved = resolve_revisions(self.conn, pairs, revisions, self.batch_size)?;
        if self.dry_run {
            return Ok((resolved.revisions.keys().cloned().collect(), resolved));
        }

        let now = Utc::now().timestamp_millis();
        let rows: Vec<NewSnapshot> = resolved
            .revisions
            .iter()
            .map(|(pair, revision_id)| NewSnapshot {
                pair: pair.clone(),
                revision_id: *revision_id,
                context_id: self.contexts.get(&pair.parent).copied().flatten(),
                modified_by_id: self.user_id,
                created_at: now,
            })
            .collect();
        let created = insert_snapshots(self.conn, &rows, self.batch_size)?;
        self.record(&created, RevisionAction::Created, event)?;
        Ok((created.iter().map(Snapshot::pair).collect(), resolved))
    }

    fn update_pairs(
        &self,
        diff: &ScopeDiff,
        existing: &BTreeMap<Pair, Snapshot>,
        event: &PendingEvent<'_>,
        revisions: &RevisionMap,
    ) -> Result<(UpdateResult, ResolvedRevisions)> {
        let plan = StalePlan::from_diff(diff, self.stale_policy);
        let mut result = self.apply_stale_plan(&plan, existing, event)?;

        // Retired rows come back to life only when their child is in scope again
        let candidates: BTreeSet<Pair> = diff
            .keep
            .iter()
            .chain(
                plan.refresh
                    .iter()
                    .filter(|pair| existing.get(*pair).is_some_and(|s| !s.is_retired())),
            )
            .cloned()
            .collect();
        let resolved = resolve_revisions(self.conn, &candidates, revisions, self.batch_size)?;

        let updates: Vec<RevisionUpdate> = resolved
            .revisions
            .iter()
            .filter_map(|(pair, revision_id)| {
                let snapshot = existing.get(pair)?;
                (snapshot.revision_id != *revision_id || snapshot.is_retired()).then_some(
                    RevisionUpdate {
                        snapshot_id: snapshot.id,
                        revision_id: *revision_id,
                    },
                )
            })
            .collect();

        if self.dry_run {
            let ids: BTreeSet<i64> = updates.iter().map(|u| u.snapshot_id).collect();
            result.updated = existing
                .values()
                .filter(|snapshot| ids.contains(&snapshot.id))
                .map(Snapshot::pair)
                .collect();
            return Ok((result, resolved));
        }

        let updated =
            update_snapshot_revisions(self.conn, &updates, self.user_id, self.batch_size)?;
        self.record(&updated, RevisionAction::Modified, event)?;
        result.updated = updated.iter().map(Snapshot::pair).collect();
        Ok((result, resolved))
    }

    fn apply_stale_plan(
        &self,
        plan: &StalePlan,
        existing: &BTreeMap<Pair, Snapshot>,
        event: &PendingEvent<'_>,
    ) -> Result<UpdateResult> {
        let to_retire: Vec<&Snapshot> = plan
            .retire
            .iter()
            .filter_map(|pair| existing.get(pair))
            .filter(|snapshot| !snapshot.is_retired())
            .collect();
        let to_delete: Vec<Snapshot> = plan
            .delete
            .iter()
            .filter_map(|pair| existing.get(pair).cloned())
            .collect();

        let mut result = UpdateResult::default();
        if !plan.freeze.is_empty() {
            tracing::debug!(pair_count = plan.freeze.len(), "Leaving stale snapshots frozen");
        }
        if self.dry_run {
            result.retired = to_retire.iter().map(|s| s.pair()).collect();
            result.deleted = to_delete.iter().map(Snapshot::pair).collect();
            return Ok(result);
        }

        if !to_retire.is_empty() {
            let ids: Vec<i64> = to_retire.iter().map(|s| s.id).collect();
            let retired = retire_snapshots(self.conn, &ids, self.user_id, self.batch_size)?;
            self.record(&retired, RevisionAction::Modified, event)?;
            result.retired = retired.iter().map(Snapshot::pair).collect();
        }

        if !to_delete.is_empty() {
            self.record(&to_delete, RevisionAction::Deleted, event)?;
            let ids: Vec<i64> = to_delete.iter().map(|s| s.id).collect();
            delete_snapshots(self.conn, &ids, self.batch_size)?;
            result.deleted = to_delete.iter().map(Snapshot::pair).collect();
        }
        Ok(result)
    }

    /// Snapshot revisions for rows just written
    fn record(
        &self,
        snapshots: &[Snapshot],
        action: RevisionAction,
        event: &PendingEvent<'_>,
    ) -> Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }
        write_snapshot_revisions(
            self.conn,
            snapshots,
            action,
            event.id(self.conn)?,
            self.user_id,
            self.batch_size,
        )?;
        Ok(())
    }

    /// Post-write steps. Nothing runs in dry-run mode.
    fn finish(&self, touched: &BTreeSet<Pair>, run_mirror: bool) -> Result<Option<MirrorCounts>> {
        if self.dry_run {
            return Ok(None);
        }
        let counts = if run_mirror {
            let counts = mirror(self.conn, self.desired.keys(), self.user_id)?;
            if !counts.parent_links.is_empty() {
                self.acl.relationships_created(&counts.parent_links)?;
            }
            Some(counts)
        } else {
            None
        };
        if !touched.is_empty() {
            self.reindex.reindex(touched)?;
        }
        Ok(counts)
    }

    fn extra(&self, resolved: ResolvedRevisions, mirror: Option<MirrorCounts>) -> OperationExtra {
        OperationExtra {
            revisions: resolved.revisions,
            missed: resolved.missed,
            mirror,
            dry_run: self.dry_run,
        }
    }
}
