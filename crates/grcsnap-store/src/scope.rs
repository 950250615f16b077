//! Two-hop scope calculator
//!
//! First order: each `fst` entry of the parent's rule, either the related
//! objects of a type or the object a direct attribute points at. Second
//! order: objects one relationship away from a first-order neighbor whose
//! type appears in that neighbor's own `snd` rule.

use crate::errors::{sqlite_op, Result};
use crate::relationships::related_of_type;
use crate::sql::{effective_batch, list_placeholders, stub_values, text_values, tuple_placeholders};
use grcsnap_core::hooks::ObjectResolver;
use grcsnap_core::model::Stub;
use grcsnap_core::rules::{NeighborRule, RuleTable};
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};

pub struct ScopeCalculator<'a> {
    conn: &'a Connection,
    rules: &'a RuleTable,
    objects: &'a dyn ObjectResolver,
    batch_size: usize,
}

impl<'a> ScopeCalculator<'a> {
    pub fn new(
        conn: &'a Connection,
        rules: &'a RuleTable,
        objects: &'a dyn ObjectResolver,
        batch_size: usize,
    ) -> Self {
        Self {
            conn,
            rules,
            objects,
            batch_size: effective_batch(batch_size),
        }
    }

    /// Direct neighbors of `parent` according to its `fst` rule
    pub fn first_order(&self, parent: &Stub) -> Result<BTreeSet<Stub>> {
        let mut neighbors = BTreeSet::new();
        let Some(rule) = self.rules.get(&parent.object_type) else {
            return Ok(neighbors);
        };
        for neighbor in &rule.fst {
            match neighbor {
                NeighborRule::Relation(object_type) => {
                    neighbors.extend(related_of_type(self.conn, parent, object_type)?);
                }
                NeighborRule::Attribute(name) => {
                    neighbors.extend(self.objects.attribute(parent, name)?);
                }
                NeighborRule::Unrecognized { .. } => {}
            }
        }
        Ok(neighbors)
    }

    /// Objects reachable by one relationship hop from `first` whose type is
    /// allowed by the `snd` rule of the first-order object they hang off
    pub fn second_order(&self, first: &BTreeSet<Stub>) -> Result<BTreeSet<Stub>> {
        let mut by_type: BTreeMap<&str, Vec<&Stub>> = BTreeMap::new();
        for stub in first {
            by_type.entry(stub.object_type.as_str()).or_default().push(stub);
        }

        let mut found = BTreeSet::new();
        for (object_type, members) in by_type {
            let Some(allowed) = self.rules.snd_for(object_type) else {
                continue;
            };
            for chunk in members.chunks(self.batch_size) {
                found.extend(self.neighbors_of_types(chunk, allowed)?);
            }
        }
        Ok(found)
    }

    /// The candidate child set of `parent`
    ///
    /// The parent itself and snapshot rows are never part of a scope.
    pub fn scope(&self, parent: &Stub) -> Result<BTreeSet<Stub>> {
        let first = self.first_order(parent)?;
        let second = self.second_order(&first)?;
        let scope: BTreeSet<Stub> = first
            .into_iter()
            .chain(second)
            .filter(|stub| stub != parent && !stub.is_snapshot())
            .collect();
        tracing::debug!(parent = %parent, pair_count = scope.len(), "Computed scope");
        Ok(scope)
    }

    pub fn scope_many<'p>(
        &self,
        parents: impl IntoIterator<Item = &'p Stub>,
    ) -> Result<BTreeMap<Stub, BTreeSet<Stub>>> {
        parents
            .into_iter()
            .map(|parent| Ok((parent.clone(), self.scope(parent)?)))
            .collect()
    }

    /// One statement over both orientations for a batch of same-type objects
    fn neighbors_of_types(&self, sources: &[&Stub], types: &BTreeSet<String>) -> Result<Vec<Stub>> {
        let width = sources.len() * 2;
        let sources_sql = tuple_placeholders(sources.len(), 2, 0);
        let types_sql = list_placeholders(types.len(), width);
        let sql = format!(
            "SELECT destination_type, destination_id FROM relationships
             WHERE (source_type, source_id) IN (VALUES {sources}) AND destination_type IN ({types})
             UNION
             SELECT source_type, source_id FROM relationships
             WHERE (destination_type, destination_id) IN (VALUES {sources}) AND source_type IN ({types})",
            sources = sources_sql,
            types = types_sql,
        );
        let mut values = stub_values(sources.iter().copied());
        values.extend(text_values(types.iter().map(String::as_str)));

        let mut stmt = self.conn.prepare(&sql).map_err(sqlite_op("second_order_scope"))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(Stub::new(row.get::<_, String>(0)?, row.get(1)?))
            })
            .map_err(sqlite_op("second_order_scope"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sqlite_op("second_order_scope"))
    }
}
