//! Core data model for recorded edits
//!
//! This module defines the persisted shapes of the recipe system: the
//! [`Delta`] (one atomic recorded edit), the [`Recipe`] (ordered deltas plus
//! metadata, the sole interchange artifact), and the identifiers that make
//! replay shape-independent.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::path::ParentRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Current recipe wire-format version
pub const RECIPE_VERSION: &str = "1.0";

/// Stable identifier of one recorded operation.
///
/// Descendant deltas reference the `OpId` of the structural transform that
/// created their substructure instead of a literal key, so replay stays
/// correct when that transform names its output differently per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(pub u64);

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Kind of edit a delta records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaOp {
    Rename,
    Delete,
    Insert,
    Transform,
}

/// One named condition gating a transform delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRef {
    /// Name of the condition in the registry
    pub condition_name: String,

    /// Ordered parameters passed to the condition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_params: Vec<Value>,
}

/// One atomic recorded edit.
///
/// A delta is immutable once appended to a recipe; a logical undo appends a
/// new delta (restoring a deleted property records a new insert) rather than
/// mutating the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// Stable, unique identifier of this operation
    pub op_id: OpId,

    /// Kind of edit
    pub op: DeltaOp,

    /// Property name acted on, as of record time
    pub key: String,

    /// Key before a rename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_key: Option<String>,

    /// Key after a rename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_key: Option<String>,

    /// Structural ancestry: the op that produced the substructure holding the
    /// target. Present exactly when such an ancestor exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_op_id: Option<OpId>,

    /// Literal parent path, dot-joined. Without `parentOpId` this names the
    /// parent from the root; with it, the relative segments below the op's
    /// own parent (first segment is the recorded generated key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,

    /// Literal value for an insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Registry name of the transform to apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_name: Option<String>,

    /// Ordered transform parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,

    /// Conditions that must all hold for a transform to run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_stack: Vec<ConditionRef>,

    /// Key this property held in untouched source data (restores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,

    /// Non-functional, human-readable note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Delta {
    /// Build a rename delta
    pub fn rename(
        op_id: OpId,
        parent: &ParentRef,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        let from_key = from_key.into();
        let (parent_op_id, parent_key) = parent.to_fields();
        Self {
            op_id,
            op: DeltaOp::Rename,
            key: from_key.clone(),
            from_key: Some(from_key),
            to_key: Some(to_key.into()),
            parent_op_id,
            parent_key,
            value: None,
            transform_name: None,
            params: Vec::new(),
            condition_stack: Vec::new(),
            source_key: None,
            description: None,
        }
    }

    /// Build a delete delta
    pub fn delete(op_id: OpId, parent: &ParentRef, key: impl Into<String>) -> Self {
        let (parent_op_id, parent_key) = parent.to_fields();
        Self {
            op_id,
            op: DeltaOp::Delete,
            key: key.into(),
            from_key: None,
            to_key: None,
            parent_op_id,
            parent_key,
            value: None,
            transform_name: None,
            params: Vec::new(),
            condition_stack: Vec::new(),
            source_key: None,
            description: None,
        }
    }

    /// Build an insert delta; `source_key` marks a restore
    pub fn insert(
        op_id: OpId,
        parent: &ParentRef,
        key: impl Into<String>,
        value: Value,
        source_key: Option<String>,
    ) -> Self {
        let (parent_op_id, parent_key) = parent.to_fields();
        Self {
            op_id,
            op: DeltaOp::Insert,
            key: key.into(),
            from_key: None,
            to_key: None,
            parent_op_id,
            parent_key,
            value: Some(value),
            transform_name: None,
            params: Vec::new(),
            condition_stack: Vec::new(),
            source_key,
            description: None,
        }
    }

    /// Build a transform delta
    pub fn transform(
        op_id: OpId,
        parent: &ParentRef,
        key: impl Into<String>,
        transform_name: impl Into<String>,
        params: Vec<Value>,
        condition_stack: Vec<ConditionRef>,
    ) -> Self {
        let (parent_op_id, parent_key) = parent.to_fields();
        Self {
            op_id,
            op: DeltaOp::Transform,
            key: key.into(),
            from_key: None,
            to_key: None,
            parent_op_id,
            parent_key,
            value: None,
            transform_name: Some(transform_name.into()),
            params,
            condition_stack,
            source_key: None,
            description: None,
        }
    }

    /// Reconstruct the parent reference from the persisted fields
    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::from_fields(self.parent_op_id, self.parent_key.as_deref())
    }

    /// Per-op required-field validation, used on import
    fn validate(&self) -> Result<()> {
        let missing = |field: &str| Error::MalformedRecipe {
            message: format!("delta {} ({:?}) is missing '{}'", self.op_id, self.op, field),
            source: None,
        };
        match self.op {
            DeltaOp::Rename => {
                if self.to_key.is_none() {
                    return Err(missing("toKey"));
                }
            }
            DeltaOp::Insert => {
                if self.value.is_none() && self.source_key.is_none() {
                    return Err(missing("value"));
                }
            }
            DeltaOp::Transform => {
                if self.transform_name.is_none() {
                    return Err(missing("transformName"));
                }
            }
            DeltaOp::Delete => {}
        }
        Ok(())
    }
}

/// Root shape of the data a recipe was recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootType {
    Object,
    Array,
}

impl RootType {
    /// Classify a source value; non-containers fall back to `Object`
    pub fn of(value: &Value) -> Self {
        if value.is_array() {
            RootType::Array
        } else {
            RootType::Object
        }
    }
}

/// Recipe bookkeeping carried alongside the deltas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMetadata {
    pub root_type: RootType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Every transform name any delta references; lets consumers check a
    /// registry up front instead of failing mid-replay.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_transforms: BTreeSet<String>,
}

/// The portable, replayable artifact: ordered deltas plus metadata.
///
/// Deltas apply strictly in recorded order; identical
/// `(sourceData, Recipe, Registry)` always yields identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub version: String,
    pub deltas: Vec<Delta>,
    pub metadata: RecipeMetadata,
}

impl Recipe {
    /// Create an empty recipe for data of the given root shape
    pub fn new(root_type: RootType) -> Self {
        let now = Utc::now();
        Self {
            version: RECIPE_VERSION.to_string(),
            deltas: Vec::new(),
            metadata: RecipeMetadata {
                root_type,
                created_at: now,
                updated_at: now,
                required_transforms: BTreeSet::new(),
            },
        }
    }

    /// Append a delta, stamping `updatedAt` and accumulating any transform
    /// name into `requiredTransforms`.
    pub fn push(&mut self, delta: Delta) {
        if let Some(name) = &delta.transform_name {
            self.metadata.required_transforms.insert(name.clone());
        }
        self.deltas.push(delta);
        self.metadata.updated_at = Utc::now();
    }

    /// Highest op id currently in the recipe, if any
    pub fn max_op_id(&self) -> Option<OpId> {
        self.deltas.iter().map(|d| d.op_id).max()
    }

    /// Parse and validate a recipe from its JSON wire form.
    ///
    /// Any parse failure or missing required field is fatal and surfaced
    /// before replay work begins.
    pub fn from_json(text: &str) -> Result<Self> {
        let recipe: Recipe = serde_json::from_str(text).map_err(|e| Error::MalformedRecipe {
            message: e.to_string(),
            source: Some(e),
        })?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::MalformedRecipe {
            message: e.to_string(),
            source: Some(e),
        })
    }

    /// Structural validation shared by import and tests
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("1.") {
            return Err(Error::MalformedRecipe {
                message: format!("unsupported recipe version '{}'", self.version),
                source: None,
            });
        }
        let mut seen = BTreeSet::new();
        for delta in &self.deltas {
            delta.validate()?;
            if !seen.insert(delta.op_id) {
                return Err(Error::MalformedRecipe {
                    message: format!("duplicate op id {}", delta.op_id),
                    source: None,
                });
            }
        }
        Ok(())
    }
}
