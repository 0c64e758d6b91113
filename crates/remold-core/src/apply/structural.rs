//! Expansion of structural transform results into new properties
//!
//! A structural transform does not substitute its result in place; the
//! sentinel it returns is rewrapped here into fresh sibling properties.
//! `split` yields one property per part suffixed `_0`, `_1`, ...; `flatten`
//! hoists nested keys as siblings prefixed by the source key. The realized
//! names are recorded against the generating op id so later deltas targeting
//! the outputs resolve on every record shape.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use super::state::{ApplyState, ResolvedParent};
use crate::collision;
use crate::path::object_at_mut;
use crate::registry::{StructuralAction, StructuralChange};
use crate::types::Delta;
use serde_json::Value;
use std::collections::HashMap;

/// Materialize a structural change under the resolved parent.
pub(crate) fn expand(
    output: &mut Value,
    state: &mut ApplyState,
    parent: &ResolvedParent,
    delta: &Delta,
    realized_key: &str,
    change: StructuralChange,
) {
    let Some(map) = object_at_mut(output, &parent.path) else {
        return;
    };

    // (recorded name, desired realized name, value), in deterministic order
    let entries: Vec<(String, String, Value)> = match change.action {
        StructuralAction::Split { parts } => parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                (
                    format!("{}_{i}", delta.key),
                    format!("{realized_key}_{i}"),
                    part,
                )
            })
            .collect(),
        StructuralAction::ToObject { object } => object
            .into_iter()
            .map(|(nested, value)| {
                (
                    format!("{}_{nested}", delta.key),
                    format!("{realized_key}_{nested}"),
                    value,
                )
            })
            .collect(),
    };

    if change.remove_source {
        if let Some(removed) = map.remove(realized_key) {
            let mut path = parent.path.clone();
            path.push(realized_key.to_string());
            state.record_tombstone(path, removed);
        }
    }

    let mut keys = HashMap::with_capacity(entries.len());
    for (recorded, desired, value) in entries {
        let taken = map.keys().cloned().collect();
        let realized = collision::resolve_key(&desired, &taken);
        map.insert(realized.clone(), value);
        state.reserve(&parent.path, &realized);
        keys.insert(recorded, realized);
    }
    state.record_op_outputs(delta.op_id, parent.path.clone(), keys);
}
