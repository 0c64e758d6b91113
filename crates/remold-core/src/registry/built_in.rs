//! Built-in transforms for common operations
//!
//! Pre-configured catalog covering string and number edits plus the two
//! structural transforms (`split`, `flatten`). Registered wholesale by
//! [`register_defaults`]; callers with custom catalogs register their own
//! [`Transform`] implementations alongside or instead.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use super::{
    param_or_default, ParamDescriptor, StructuralAction, StructuralChange, Transform,
    TransformOutput, TransformRegistry,
};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register the full built-in catalog
pub fn register_defaults(registry: &mut TransformRegistry) {
    registry.register(Arc::new(Uppercase));
    registry.register(Arc::new(Lowercase));
    registry.register(Arc::new(Trim));
    registry.register(Arc::new(ToString));
    // `to_number` carries type-specific overloads under one name
    registry.register(Arc::new(StringToNumber));
    registry.register(Arc::new(BoolToNumber));
    registry.register(Arc::new(Add));
    registry.register(Arc::new(Multiply));
    registry.register(Arc::new(Round));
    registry.register(Arc::new(Split));
    registry.register(Arc::new(Flatten));
}

fn numeric_param(transform: &dyn Transform, params: &[Value], index: usize) -> Result<f64> {
    let value = param_or_default(transform, params, index);
    value.as_f64().ok_or_else(|| Error::InvalidParams {
        transform: transform.name().to_string(),
        message: format!(
            "parameter '{}' must be a number, got {}",
            transform
                .params()
                .get(index)
                .map(|d| d.name)
                .unwrap_or("?"),
            value
        ),
    })
}

fn string_param(transform: &dyn Transform, params: &[Value], index: usize) -> Result<String> {
    let value = param_or_default(transform, params, index);
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidParams {
            transform: transform.name().to_string(),
            message: format!(
                "parameter '{}' must be a string, got {}",
                transform
                    .params()
                    .get(index)
                    .map(|d| d.name)
                    .unwrap_or("?"),
                value
            ),
        })
}

/// Uppercase a string value
pub struct Uppercase;

impl Transform for Uppercase {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let s = value.as_str().unwrap_or_default();
        Ok(TransformOutput::Value(json!(s.to_uppercase())))
    }
}

/// Lowercase a string value
pub struct Lowercase;

impl Transform for Lowercase {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let s = value.as_str().unwrap_or_default();
        Ok(TransformOutput::Value(json!(s.to_lowercase())))
    }
}

/// Trim surrounding whitespace from a string value
pub struct Trim;

impl Transform for Trim {
    fn name(&self) -> &str {
        "trim"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let s = value.as_str().unwrap_or_default();
        Ok(TransformOutput::Value(json!(s.trim())))
    }
}

/// Render a scalar as its string form
pub struct ToString;

impl Transform for ToString {
    fn name(&self) -> &str {
        "to_string"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_number() || value.is_boolean()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        Ok(TransformOutput::Value(json!(value.to_string())))
    }
}

/// `to_number` overload for numeric strings
pub struct StringToNumber;

impl Transform for StringToNumber {
    fn name(&self) -> &str {
        "to_number"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value
            .as_str()
            .map(|s| s.trim().parse::<f64>().is_ok())
            .unwrap_or(false)
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let parsed: f64 = value
            .as_str()
            .unwrap_or_default()
            .trim()
            .parse()
            .map_err(|e| Error::InvalidParams {
                transform: self.name().to_string(),
                message: format!("unparseable number: {e}"),
            })?;
        Ok(TransformOutput::Value(json!(parsed)))
    }
}

/// `to_number` overload for booleans (`true` → 1, `false` → 0)
pub struct BoolToNumber;

impl Transform for BoolToNumber {
    fn name(&self) -> &str {
        "to_number"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_boolean()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let b = value.as_bool().unwrap_or(false);
        Ok(TransformOutput::Value(json!(if b { 1 } else { 0 })))
    }
}

/// Add a constant to a numeric value
pub struct Add;

impl Transform for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn apply(&self, value: &Value, params: &[Value]) -> Result<TransformOutput> {
        let amount = numeric_param(self, params, 0)?;
        let base = value.as_f64().unwrap_or_default();
        Ok(TransformOutput::Value(number(base + amount)))
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        vec![ParamDescriptor::new("amount", json!(1))]
    }
}

/// Multiply a numeric value by a constant
pub struct Multiply;

impl Transform for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn apply(&self, value: &Value, params: &[Value]) -> Result<TransformOutput> {
        let factor = numeric_param(self, params, 0)?;
        let base = value.as_f64().unwrap_or_default();
        Ok(TransformOutput::Value(number(base * factor)))
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        vec![ParamDescriptor::new("factor", json!(2))]
    }
}

/// Round a numeric value to the nearest integer
pub struct Round;

impl Transform for Round {
    fn name(&self) -> &str {
        "round"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let base = value.as_f64().unwrap_or_default();
        Ok(TransformOutput::Value(json!(base.round() as i64)))
    }
}

/// Keep integral results integral so replay output stays stable across
/// records that mix integer and float fields.
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Structural: split a string on a separator into one property per part
pub struct Split;

impl Transform for Split {
    fn name(&self) -> &str {
        "split"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn apply(&self, value: &Value, params: &[Value]) -> Result<TransformOutput> {
        let separator = string_param(self, params, 0)?;
        let s = value.as_str().unwrap_or_default();
        let parts: Vec<Value> = if separator.is_empty() {
            s.chars().map(|c| json!(c.to_string())).collect()
        } else {
            s.split(separator.as_str()).map(|p| json!(p)).collect()
        };
        Ok(TransformOutput::Structural(StructuralChange {
            action: StructuralAction::Split { parts },
            remove_source: true,
        }))
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        vec![ParamDescriptor::new("separator", json!(","))]
    }
}

/// Structural: hoist an object's keys as siblings prefixed by the source key
pub struct Flatten;

impl Transform for Flatten {
    fn name(&self) -> &str {
        "flatten"
    }

    fn applies_to(&self, value: &Value) -> bool {
        value.is_object()
    }

    fn apply(&self, value: &Value, _params: &[Value]) -> Result<TransformOutput> {
        let object = value.as_object().cloned().unwrap_or_default();
        Ok(TransformOutput::Structural(StructuralChange {
            action: StructuralAction::ToObject { object },
            remove_source: true,
        }))
    }
}
