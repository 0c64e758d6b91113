//! Delta recorder: turns live edits into recipe deltas
//!
//! The recorder sits between the editing layer and the recipe: every edit
//! appends exactly one immutable delta, with parent addressing computed
//! through [`PathResolver`] so the recorded recipe replays against records of
//! a different shape. Undo is always an append, never a mutation of an
//! earlier delta: restoring a deleted property records a fresh insert
//! carrying `sourceKey`.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::collision;
use crate::error::{Error, Result};
use crate::path::{ParentRef, PathResolver};
use crate::record::arena::{NodeArena, NodeId};
use crate::types::{ConditionRef, Delta, OpId, Recipe, RootType};
use serde_json::Value;

/// Records edits as deltas and keeps the arena's key identity in sync
#[derive(Debug, Clone)]
pub struct DeltaRecorder {
    arena: NodeArena,
    recipe: Recipe,
    next_op: u64,
}

impl DeltaRecorder {
    /// Start a fresh session over `baseline`
    pub fn new(baseline: &Value) -> Self {
        Self {
            arena: NodeArena::from_value(baseline),
            recipe: Recipe::new(RootType::of(baseline)),
            next_op: 1,
        }
    }

    /// Resume a session: `live` is the already-transformed tree the imported
    /// `recipe` produced; newly recorded deltas append after the imported
    /// ones with op ids continuing past them.
    pub fn with_recipe(live: &Value, recipe: Recipe) -> Self {
        let next_op = recipe.max_op_id().map(|op| op.0 + 1).unwrap_or(1);
        Self {
            arena: NodeArena::from_value(live),
            recipe,
            next_op,
        }
    }

    /// The recipe accumulated so far
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// The live tree's identity arena
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Op id of the structural transform that created `node`, letting
    /// callers compute `parentOpId` for its descendants
    pub fn op_id_for_node(&self, node: NodeId) -> Option<OpId> {
        self.arena.created_by(node)
    }

    /// Parent reference for a delta that would target `node`
    pub fn parent_ref_of(&self, node: NodeId) -> ParentRef {
        PathResolver::parent_ref(&self.arena, node)
    }

    /// Empty the recipe (wholesale import-replace); the live tree and its
    /// key identity are untouched.
    pub fn clear(&mut self) {
        self.recipe.deltas.clear();
        self.recipe.metadata.required_transforms.clear();
        self.recipe.metadata.updated_at = chrono::Utc::now();
    }

    fn next_op_id(&mut self) -> OpId {
        let id = OpId(self.next_op);
        self.next_op += 1;
        id
    }

    fn target(&self, parent: &ParentRef, key: &str) -> Result<NodeId> {
        PathResolver::locate(&self.arena, parent, key, false).ok_or_else(|| Error::UnknownKey {
            key: key.to_string(),
        })
    }

    fn parent_node(&self, parent: &ParentRef) -> Result<NodeId> {
        PathResolver::resolve_parent(&self.arena, parent).ok_or_else(|| Error::UnknownKey {
            key: match parent {
                ParentRef::Root => String::new(),
                ParentRef::Literal { path } | ParentRef::Op { path, .. } => path.join("."),
            },
        })
    }

    /// Record a rename. The caller resolves collisions through the policy
    /// before the key reaches here, so a recorded rename delta is always
    /// collision-free at record time. A deleted child keeps its key until it
    /// is explicitly renamed, so deleted targets resolve too; a live sibling
    /// holding the same key takes priority.
    pub fn record_rename(
        &mut self,
        old_key: &str,
        new_key: &str,
        parent: &ParentRef,
    ) -> Result<OpId> {
        let node = PathResolver::locate(&self.arena, parent, old_key, true).ok_or_else(|| {
            Error::UnknownKey {
                key: old_key.to_string(),
            }
        })?;
        let parent_node = self.parent_node(parent)?;
        let taken = self.arena.live_sibling_keys(parent_node, Some(node));
        if taken.contains(new_key) {
            return Err(Error::KeyCollision {
                key: new_key.to_string(),
            });
        }

        self.arena.set_key(node, new_key, false);
        let op_id = self.next_op_id();
        self.recipe
            .push(Delta::rename(op_id, parent, old_key, new_key));
        Ok(op_id)
    }

    /// Record a delete. The node keeps its key and stays restorable.
    pub fn record_delete(&mut self, key: &str, parent: &ParentRef) -> Result<OpId> {
        let node = self.target(parent, key)?;
        self.arena.mark_deleted(node);
        let op_id = self.next_op_id();
        self.recipe.push(Delta::delete(op_id, parent, key));
        Ok(op_id)
    }

    /// Record an insert; with `source_key` this is a restore of a previously
    /// deleted property.
    ///
    /// A restore reclaiming its original key displaces any live occupant via
    /// the collision policy (the occupant moves, never the restoring node).
    /// Displacement is metadata only, no occupant delta is appended: replay
    /// reproduces it deterministically from the insert itself.
    pub fn record_insert(
        &mut self,
        key: &str,
        value: Value,
        parent: &ParentRef,
        source_key: Option<&str>,
    ) -> Result<OpId> {
        let parent_node = self.parent_node(parent)?;
        let occupant = self.arena.child_by_key(parent_node, key);

        if source_key.is_some() {
            if let Some(occ) = occupant {
                let mut taken = self.arena.reserved_sibling_keys(parent_node);
                taken.insert(key.to_string());
                let displaced = collision::displacement_key(key, &taken);
                log::debug!("restore of '{key}' displaces occupant to '{displaced}'");
                self.arena.set_key(occ, displaced, true);
            }
            match self.arena.deleted_child_by_key(parent_node, key) {
                Some(node) => self.arena.mark_restored(node),
                None => {
                    self.arena.insert_child(parent_node, key, None);
                }
            }
        } else {
            if occupant.is_some() {
                return Err(Error::KeyCollision {
                    key: key.to_string(),
                });
            }
            self.arena.insert_child(parent_node, key, None);
        }

        let op_id = self.next_op_id();
        self.recipe.push(Delta::insert(
            op_id,
            parent,
            key,
            value,
            source_key.map(str::to_string),
        ));
        Ok(op_id)
    }

    /// Record a transform by registry name. Returns the new op id; if the
    /// transform is structural, the editing layer reports the properties it
    /// materialized via [`register_structural_outputs`].
    ///
    /// [`register_structural_outputs`]: DeltaRecorder::register_structural_outputs
    pub fn record_transform(
        &mut self,
        key: &str,
        transform_name: &str,
        params: Vec<Value>,
        condition_stack: Vec<ConditionRef>,
        parent: &ParentRef,
    ) -> Result<OpId> {
        self.target(parent, key)?;
        let op_id = self.next_op_id();
        self.recipe.push(Delta::transform(
            op_id,
            parent,
            key,
            transform_name,
            params,
            condition_stack,
        ));
        Ok(op_id)
    }

    /// Register the properties a structural transform materialized in the
    /// live tree. Each `(key, value)` pair becomes an arena node carrying the
    /// generating op id; object values are mirrored recursively, so edits
    /// inside a generated substructure resolve like any other.
    ///
    /// Returns the realized (collision-resolved) keys in input order.
    pub fn register_structural_outputs(
        &mut self,
        op: OpId,
        generated: &[(String, Value)],
        remove_source: bool,
    ) -> Result<Vec<String>> {
        let delta = self
            .recipe
            .deltas
            .iter()
            .find(|d| d.op_id == op)
            .cloned()
            .ok_or_else(|| Error::Internal {
                message: format!("no recorded delta with id {op}"),
                source: anyhow::anyhow!("structural outputs registered before their transform"),
            })?;
        let parent = delta.parent_ref();
        let source = self.target(&parent, &delta.key)?;
        let parent_node = self.parent_node(&parent)?;

        if remove_source {
            self.arena.mark_deleted(source);
        }

        let mut realized = Vec::with_capacity(generated.len());
        for (key, value) in generated {
            let taken = self.arena.live_sibling_keys(parent_node, None);
            let resolved = collision::resolve_key(key, &taken);
            self.arena
                .insert_subtree(parent_node, resolved.clone(), value, Some(op));
            realized.push(resolved);
        }
        Ok(realized)
    }
}
