//! Variable store and interpolation
//!
//! Values saved from one response are substituted into later requests of the
//! same file through `{{name}}` placeholders.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::common::PathError;

use super::values::display_value;

/// Per-file variable scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: BTreeMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{{name}}` whose name is stored. Unknown placeholders
    /// are left untouched.
    pub fn interpolate(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (name, value) in &self.values {
            let placeholder = format!("{{{{{name}}}}}");
            if result.contains(&placeholder) {
                result = result.replace(&placeholder, &display_value(value));
            }
        }
        result
    }
}

/// Interpolate with an optional store; no store means no substitution
pub fn interpolate(text: &str, vars: Option<&VariableStore>) -> String {
    match vars {
        Some(vars) => vars.interpolate(text),
        None => text.to_string(),
    }
}

/// Walk a dot path through nested JSON objects.
///
/// Every segment must index into an object; arrays are not traversed, so
/// `items.0` fails against an array.
pub fn extract<'a>(data: &'a Map<String, Value>, path: &str) -> Result<&'a Value, PathError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut current = data.get(first).ok_or_else(|| PathError::NotFound {
        path: path.to_string(),
    })?;

    for segment in segments {
        let Value::Object(object) = current else {
            return Err(PathError::NotTraversable {
                segment: segment.to_string(),
            });
        };
        current = object.get(segment).ok_or_else(|| PathError::NotFound {
            path: path.to_string(),
        })?;
    }

    Ok(current)
}
