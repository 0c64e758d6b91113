//! Replay engine: applies a recipe to source data
//!
//! `apply(sourceData, recipe, registry)` is a pure, synchronous fold: the
//! source is never mutated, deltas run strictly in recorded order, and the
//! only mutable state is an [`state::ApplyState`] scoped to the call.
//! Identical `(sourceData, recipe, registry)` always yields identical
//! output. Re-applying a recipe to already-transformed data is *not*
//! guaranteed idempotent: deltas model a sequence of edits, not a checked
//! patch.
//!
//! Heterogeneous records are expected: a delta whose resolved path does not
//! exist on the current record is a local no-op, and a key collision replay
//! produces that recording never saw resolves through the shared collision
//! policy, so the realized output key may differ from the recorded one.
//! Only an unknown transform name is fatal.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

pub mod batch;
mod state;
mod structural;

#[cfg(test)]
mod tests;

use crate::collision;
use crate::error::Result;
use crate::path::{object_at, object_at_mut, ParentRef};
use crate::registry::{TransformOutput, TransformRegistry};
use crate::types::{Delta, DeltaOp, Recipe};
use serde_json::Value;
use state::{ApplyState, ResolvedParent};

pub use batch::apply_batch;

/// Replays recipes against source data using a transform registry
#[derive(Debug, Clone, Copy)]
pub struct DeltaApplier<'r> {
    registry: &'r TransformRegistry,
}

impl<'r> DeltaApplier<'r> {
    pub fn new(registry: &'r TransformRegistry) -> Self {
        Self { registry }
    }

    /// Apply every delta of `recipe` to a copy of `source`.
    ///
    /// Fails fast, before any replay work, if a delta names a transform
    /// the registry does not carry.
    pub fn apply(&self, source: &Value, recipe: &Recipe) -> Result<Value> {
        for delta in &recipe.deltas {
            if let Some(name) = &delta.transform_name {
                self.registry.candidates(name)?;
            }
        }

        let mut output = source.clone();
        let mut state = ApplyState::default();
        for delta in &recipe.deltas {
            self.apply_delta(delta, source, &mut output, &mut state)?;
        }
        Ok(output)
    }

    fn apply_delta(
        &self,
        delta: &Delta,
        source: &Value,
        output: &mut Value,
        state: &mut ApplyState,
    ) -> Result<()> {
        let Some(parent) = state.resolve_parent(&delta.parent_ref()) else {
            log::debug!("{}: parent not realized on this record, skipping", delta.op_id);
            return Ok(());
        };
        match delta.op {
            DeltaOp::Rename => self.apply_rename(delta, output, state, &parent),
            DeltaOp::Delete => self.apply_delete(delta, output, state, &parent),
            DeltaOp::Insert => self.apply_insert(delta, source, output, state, &parent),
            DeltaOp::Transform => {
                return self.apply_transform(delta, output, state, &parent);
            }
        }
        Ok(())
    }

    fn apply_rename(
        &self,
        delta: &Delta,
        output: &mut Value,
        state: &mut ApplyState,
        parent: &ResolvedParent,
    ) {
        let Some(intended) = delta.to_key.as_deref() else {
            return;
        };
        let from = state.realize_key(parent, delta.from_key.as_deref().unwrap_or(&delta.key));
        state.reserve(&parent.path, &from);
        state.reserve(&parent.path, intended);

        let Some(map) = object_at_mut(output, &parent.path) else {
            return;
        };
        let Some(value) = map.remove(&from) else {
            return; // absent on this record shape
        };
        let taken = map.keys().cloned().collect();
        let realized = collision::resolve_key(intended, &taken);
        if realized != intended {
            log::warn!(
                "{}: rename to '{intended}' collided during replay, realized '{realized}'",
                delta.op_id
            );
        }
        map.insert(realized.clone(), value);
        state.record_alias(&parent.path, intended, &realized);
    }

    fn apply_delete(
        &self,
        delta: &Delta,
        output: &mut Value,
        state: &mut ApplyState,
        parent: &ResolvedParent,
    ) {
        let key = state.realize_key(parent, &delta.key);
        state.reserve(&parent.path, &key);
        let Some(map) = object_at_mut(output, &parent.path) else {
            return;
        };
        if let Some(removed) = map.remove(&key) {
            let mut path = parent.path.clone();
            path.push(key);
            state.record_tombstone(path, removed);
        }
    }

    fn apply_insert(
        &self,
        delta: &Delta,
        source: &Value,
        output: &mut Value,
        state: &mut ApplyState,
        parent: &ResolvedParent,
    ) {
        let value = self.insert_value(delta, source, state, parent);
        let intended = delta.key.as_str();
        state.reserve(&parent.path, intended);

        let Some(map) = object_at_mut(output, &parent.path) else {
            return;
        };
        if delta.source_key.is_some() {
            // Restore: the restoring node reclaims its key; a live occupant
            // is displaced onto a fresh suffix instead.
            let target = state.realize_key(parent, intended);
            if let Some(occupant_value) = map.remove(&target) {
                let mut taken: std::collections::BTreeSet<String> =
                    map.keys().cloned().collect();
                taken.insert(target.clone());
                taken.extend(state.reserved_keys(&parent.path));
                let displaced = collision::displacement_key(&target, &taken);
                log::warn!(
                    "{}: restore of '{target}' displaced its occupant to '{displaced}'",
                    delta.op_id
                );
                map.insert(displaced.clone(), occupant_value);
                state.reserve(&parent.path, &displaced);
            }
            map.insert(target, value);
        } else {
            let taken = map.keys().cloned().collect();
            let realized = collision::resolve_key(intended, &taken);
            if realized != intended {
                log::warn!(
                    "{}: insert of '{intended}' collided during replay, realized '{realized}'",
                    delta.op_id
                );
            }
            map.insert(realized.clone(), value);
            state.record_alias(&parent.path, intended, &realized);
        }
    }

    /// Value an insert materializes: for restores, the untouched source wins,
    /// then a value tombstoned by an earlier delete in this call, then the
    /// recorded literal.
    fn insert_value(
        &self,
        delta: &Delta,
        source: &Value,
        state: &ApplyState,
        parent: &ResolvedParent,
    ) -> Value {
        if let Some(source_key) = &delta.source_key {
            if let Some(v) = source_value(source, &delta.parent_ref(), source_key) {
                return v;
            }
            let mut path = parent.path.clone();
            path.push(state.realize_key(parent, source_key));
            if let Some(v) = state.tombstone(&path) {
                return v.clone();
            }
        }
        delta.value.clone().unwrap_or(Value::Null)
    }

    fn apply_transform(
        &self,
        delta: &Delta,
        output: &mut Value,
        state: &mut ApplyState,
        parent: &ResolvedParent,
    ) -> Result<()> {
        let Some(name) = delta.transform_name.as_deref() else {
            return Ok(());
        };
        let key = state.realize_key(parent, &delta.key);
        let Some(current) = object_at(output, &parent.path)
            .and_then(|map| map.get(&key))
            .cloned()
        else {
            return Ok(()); // absent on this record shape
        };

        // All conditions must hold; a missing condition name never holds.
        for gate in &delta.condition_stack {
            let holds = self
                .registry
                .condition(&gate.condition_name)
                .map(|c| c.evaluate(&current, &gate.condition_params))
                .unwrap_or(false);
            if !holds {
                log::debug!(
                    "{}: condition '{}' does not hold, skipping '{name}'",
                    delta.op_id,
                    gate.condition_name
                );
                return Ok(());
            }
        }

        let Some(transform) = self.registry.select(name, &current)? else {
            // known name, no candidate for this value type: silent no-op
            log::debug!("{}: '{name}' does not apply to the current value", delta.op_id);
            return Ok(());
        };

        match transform.apply(&current, &delta.params)? {
            TransformOutput::Value(result) => {
                if let Some(map) = object_at_mut(output, &parent.path) {
                    map.insert(key, result);
                }
            }
            TransformOutput::Structural(change) => {
                structural::expand(output, state, parent, delta, &key, change);
            }
        }
        Ok(())
    }
}

fn source_value(source: &Value, parent: &ParentRef, key: &str) -> Option<Value> {
    match parent {
        ParentRef::Root => source.as_object()?.get(key).cloned(),
        ParentRef::Literal { path } => object_at(source, path)?.get(key).cloned(),
        // op-anchored substructures do not exist in untouched source data
        ParentRef::Op { .. } => None,
    }
}
