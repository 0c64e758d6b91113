//! Batch replay over arrays of records
//!
//! A recipe recorded against one example record applies to each record of an
//! array independently; no record ever observes another's result, so the
//! fold is embarrassingly parallel. The reference runner is sequential: cost
//! is dominated by per-record traversal, not I/O.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use super::DeltaApplier;
use crate::error::Result;
use crate::registry::TransformRegistry;
use crate::types::Recipe;
use serde_json::Value;

/// Apply `recipe` to every record, preserving input order.
pub fn apply_batch(
    records: &[Value],
    recipe: &Recipe,
    registry: &TransformRegistry,
) -> Result<Vec<Value>> {
    let applier = DeltaApplier::new(registry);
    records
        .iter()
        .map(|record| applier.apply(record, recipe))
        .collect()
}

/// Convenience wrapper for a whole array value: each element is treated as
/// one record; a non-array input is applied as a single record.
pub fn apply_to_value(
    data: &Value,
    recipe: &Recipe,
    registry: &TransformRegistry,
) -> Result<Value> {
    match data.as_array() {
        Some(records) => Ok(Value::Array(apply_batch(records, recipe, registry)?)),
        None => DeltaApplier::new(registry).apply(data, recipe),
    }
}
