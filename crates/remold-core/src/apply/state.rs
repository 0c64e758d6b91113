//! Per-call replay state
//!
//! One `apply` call owns exactly one [`ApplyState`]; it is never shared
//! across calls, which is what keeps batch replay embarrassingly parallel.
//! The state answers the replay-time half of path resolution: which concrete
//! path an op-anchored parent reference denotes on *this* record, and which
//! realized key an intended key ended up under after collision resolution.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::path::ParentRef;
use crate::types::OpId;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// What a structural transform actually produced on the current record
#[derive(Debug, Clone)]
pub(crate) struct OpRealization {
    /// Concrete path of the parent the outputs were materialized under
    pub parent: Vec<String>,

    /// Recorded generated key → realized key
    pub keys: HashMap<String, String>,
}

/// A parent reference resolved to a concrete location on this record
#[derive(Debug, Clone)]
pub(crate) struct ResolvedParent {
    pub path: Vec<String>,

    /// Set when the target is a direct output of this op, so key realization
    /// goes through the op's output map first
    pub op: Option<OpId>,
}

/// Mutable state scoped to a single `apply` call
#[derive(Debug, Default)]
pub(crate) struct ApplyState {
    op_outputs: HashMap<OpId, OpRealization>,
    /// Per parent path: intended key → realized key, recorded whenever
    /// replay had to deviate from the recorded name
    aliases: HashMap<Vec<String>, HashMap<String, String>>,
    /// Values removed by earlier deltas in this call, by concrete path
    tombstones: HashMap<Vec<String>, Value>,
    /// Per parent path: every key some delta has already claimed or vacated;
    /// displaced occupants must steer clear of all of them
    reserved: HashMap<Vec<String>, BTreeSet<String>>,
}

impl ApplyState {
    /// Resolve a parent reference against what this replay has realized so
    /// far. `None` means the parent does not exist on this record (for an op
    /// anchor: the generating transform never ran here) and the delta is a
    /// no-op.
    pub fn resolve_parent(&self, parent: &ParentRef) -> Option<ResolvedParent> {
        match parent {
            ParentRef::Root => Some(ResolvedParent {
                path: Vec::new(),
                op: None,
            }),
            ParentRef::Literal { path } => {
                let mut resolved = Vec::with_capacity(path.len());
                for segment in path {
                    let realized = self.alias_or(&resolved, segment);
                    resolved.push(realized);
                }
                Some(ResolvedParent {
                    path: resolved,
                    op: None,
                })
            }
            ParentRef::Op { op, path } => {
                let realization = self.op_outputs.get(op)?;
                if path.is_empty() {
                    return Some(ResolvedParent {
                        path: realization.parent.clone(),
                        op: Some(*op),
                    });
                }
                let mut resolved = realization.parent.clone();
                let first = realization
                    .keys
                    .get(&path[0])
                    .cloned()
                    .unwrap_or_else(|| self.alias_or(&resolved, &path[0]));
                resolved.push(first);
                for segment in &path[1..] {
                    let realized = self.alias_or(&resolved, segment);
                    resolved.push(realized);
                }
                Some(ResolvedParent {
                    path: resolved,
                    op: None,
                })
            }
        }
    }

    /// Realized key for a recorded key under a resolved parent
    pub fn realize_key(&self, parent: &ResolvedParent, key: &str) -> String {
        if let Some(op) = parent.op {
            if let Some(realization) = self.op_outputs.get(&op) {
                if let Some(realized) = realization.keys.get(key) {
                    return realized.clone();
                }
            }
        }
        self.alias_or(&parent.path, key)
    }

    fn alias_or(&self, parent: &[String], key: &str) -> String {
        self.aliases
            .get(parent)
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Remember that `intended` landed under `realized`, so later deltas
    /// referencing the intended name still resolve.
    pub fn record_alias(&mut self, parent: &[String], intended: &str, realized: &str) {
        if intended != realized {
            self.aliases
                .entry(parent.to_vec())
                .or_default()
                .insert(intended.to_string(), realized.to_string());
        }
    }

    /// Record what a structural op produced on this record
    pub fn record_op_outputs(
        &mut self,
        op: OpId,
        parent: Vec<String>,
        keys: HashMap<String, String>,
    ) {
        self.op_outputs.insert(op, OpRealization { parent, keys });
    }

    /// Stash a value removed at `path` for later restores
    pub fn record_tombstone(&mut self, path: Vec<String>, value: Value) {
        self.tombstones.insert(path, value);
    }

    /// Value an earlier delete removed at `path`, if any
    pub fn tombstone(&self, path: &[String]) -> Option<&Value> {
        self.tombstones.get(path)
    }

    /// Mark a key as historically claimed under a parent
    pub fn reserve(&mut self, parent: &[String], key: &str) {
        self.reserved
            .entry(parent.to_vec())
            .or_default()
            .insert(key.to_string());
    }

    /// Keys historically claimed under a parent during this call
    pub fn reserved_keys(&self, parent: &[String]) -> BTreeSet<String> {
        self.reserved.get(parent).cloned().unwrap_or_default()
    }
}
