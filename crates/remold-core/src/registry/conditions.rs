//! Built-in named conditions gating conditional transforms
//!
//! A transform delta may carry a condition stack; every condition must hold
//! against the current value or the transform is a silent no-op for that
//! record. Conditions are pure predicates, registered by name like
//! transforms.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use super::{Condition, TransformRegistry};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Register the built-in condition catalog
pub fn register_defaults(registry: &mut TransformRegistry) {
    registry.register_condition(Arc::new(IsString));
    registry.register_condition(Arc::new(IsNumber));
    registry.register_condition(Arc::new(Equals));
    registry.register_condition(Arc::new(Matches::new()));
    registry.register_condition(Arc::new(LongerThan));
}

/// Value is a string
pub struct IsString;

impl Condition for IsString {
    fn name(&self) -> &str {
        "is_string"
    }

    fn evaluate(&self, value: &Value, _params: &[Value]) -> bool {
        value.is_string()
    }
}

/// Value is a number
pub struct IsNumber;

impl Condition for IsNumber {
    fn name(&self) -> &str {
        "is_number"
    }

    fn evaluate(&self, value: &Value, _params: &[Value]) -> bool {
        value.is_number()
    }
}

/// Value equals the first parameter exactly
pub struct Equals;

impl Condition for Equals {
    fn name(&self) -> &str {
        "equals"
    }

    fn evaluate(&self, value: &Value, params: &[Value]) -> bool {
        params.first().map(|p| p == value).unwrap_or(false)
    }
}

/// String value matches the regex given as the first parameter.
///
/// Compiled patterns are cached per pattern string, so batch replay compiles
/// each one once instead of per record. An invalid pattern evaluates false
/// rather than erroring; condition failure only skips the gated transform.
pub struct Matches {
    cache: Mutex<HashMap<String, Option<Regex>>>,
}

impl Matches {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn compiled(&self, pattern: &str, apply: impl FnOnce(&Regex) -> bool) -> bool {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = cache.entry(pattern.to_string()).or_insert_with(|| {
            match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("condition 'matches' got an invalid pattern '{pattern}': {e}");
                    None
                }
            }
        });
        entry.as_ref().map(apply).unwrap_or(false)
    }
}

impl Default for Matches {
    fn default() -> Self {
        Self::new()
    }
}

impl Condition for Matches {
    fn name(&self) -> &str {
        "matches"
    }

    fn evaluate(&self, value: &Value, params: &[Value]) -> bool {
        let (Some(s), Some(pattern)) = (value.as_str(), params.first().and_then(Value::as_str))
        else {
            return false;
        };
        self.compiled(pattern, |re| re.is_match(s))
    }
}

/// String length (or array length) exceeds the first parameter
pub struct LongerThan;

impl Condition for LongerThan {
    fn name(&self) -> &str {
        "longer_than"
    }

    fn evaluate(&self, value: &Value, params: &[Value]) -> bool {
        let Some(min) = params.first().and_then(Value::as_u64) else {
            return false;
        };
        let len = match value {
            Value::String(s) => s.chars().count() as u64,
            Value::Array(items) => items.len() as u64,
            _ => return false,
        };
        len > min
    }
}
