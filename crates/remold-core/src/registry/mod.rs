//! Named transform catalog used during recording and replay
//!
//! Transforms are pure named units: free of hidden state and I/O so a recipe
//! replays reproducibly anywhere the same names are registered. A transform
//! either preserves shape (its result substitutes in place) or is
//! *structural*, returning a [`StructuralChange`] that tells the replay
//! engine to rewrap the result into new sibling properties instead.
//!
//! # Module Organization
//!
//! - [`built_in`] - value and structural transforms shipped with the crate
//! - [`conditions`] - named predicates gating conditional transforms
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

pub mod built_in;
pub mod conditions;


use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Descriptor of one ordered transform parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub default: Value,
}

impl ParamDescriptor {
    pub fn new(name: &'static str, default: Value) -> Self {
        Self { name, default }
    }
}

/// Shape-expanding action signalled by a structural transform
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralAction {
    /// Rewrap each part as its own property, suffixed `_0`, `_1`, ...
    Split { parts: Vec<Value> },

    /// Hoist the object's keys as siblings prefixed by the original key
    ToObject { object: Map<String, Value> },
}

/// Sentinel returned by structural transforms
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralChange {
    pub action: StructuralAction,

    /// Whether the source property is removed after expansion
    pub remove_source: bool,
}

/// Result of applying a transform
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutput {
    /// Same-shape result, substituted in place
    Value(Value),

    /// Shape-expanding result, rewrapped by the replay engine
    Structural(StructuralChange),
}

/// A named pure value function.
///
/// `apply` must be synchronous and side-effect-free; asynchronous or
/// I/O-bound transforms are unsupported. Applying a transform whose
/// `applies_to` is false is a silent no-op, which is what lets one recipe
/// tolerate heterogeneous records without aborting.
pub trait Transform: Send + Sync {
    /// Registry name; one name may carry type-specific overloads
    fn name(&self) -> &str;

    /// Whether this candidate can act on the given value
    fn applies_to(&self, value: &Value) -> bool;

    /// Apply to a value it answers `applies_to` for
    fn apply(&self, value: &Value, params: &[Value]) -> Result<TransformOutput>;

    /// Ordered parameter descriptors with defaults
    fn params(&self) -> Vec<ParamDescriptor> {
        Vec::new()
    }
}

/// A named predicate gating conditional transforms
pub trait Condition: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, value: &Value, params: &[Value]) -> bool;
}

/// Fetch the nth parameter, falling back to the transform's declared default.
pub fn param_or_default(transform: &dyn Transform, params: &[Value], index: usize) -> Value {
    params.get(index).cloned().unwrap_or_else(|| {
        transform
            .params()
            .get(index)
            .map(|d| d.default.clone())
            .unwrap_or(Value::Null)
    })
}

/// Registry of named transforms and conditions.
///
/// Indexed by name up front (name → candidate set) rather than scanned
/// linearly, so large-batch replay stays fast.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Vec<Arc<dyn Transform>>>,
    conditions: HashMap<String, Arc<dyn Condition>>,
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in catalog
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        built_in::register_defaults(&mut registry);
        conditions::register_defaults(&mut registry);
        registry
    }

    /// Register a transform under its name; same-name registrations become
    /// overload candidates tried in registration order.
    pub fn register(&mut self, transform: Arc<dyn Transform>) {
        self.transforms
            .entry(transform.name().to_string())
            .or_default()
            .push(transform);
    }

    /// Register a named condition, replacing any previous one of that name
    pub fn register_condition(&mut self, condition: Arc<dyn Condition>) {
        self.conditions
            .insert(condition.name().to_string(), condition);
    }

    /// Whether any candidate is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Candidate set for a name; `Err(UnknownTransform)` when the name is
    /// entirely absent (a known name with no applicable candidate is the
    /// caller's silent no-op, an unknown name is fatal).
    pub fn candidates(&self, name: &str) -> Result<&[Arc<dyn Transform>]> {
        self.transforms
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownTransform {
                name: name.to_string(),
            })
    }

    /// First candidate under `name` that applies to `value`
    pub fn select(&self, name: &str, value: &Value) -> Result<Option<&Arc<dyn Transform>>> {
        Ok(self
            .candidates(name)?
            .iter()
            .find(|t| t.applies_to(value)))
    }

    /// Look up a condition; a missing name is treated as never holding
    pub fn condition(&self, name: &str) -> Option<&Arc<dyn Condition>> {
        self.conditions.get(name)
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .finish()
    }
}
