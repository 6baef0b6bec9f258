//! Expected-value grammar, type-aware equality, and field transforms

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Number, Value};

use crate::common::{Error, Result};

/// Default string form of a JSON value.
///
/// Strings render without quotes, whole floats without a fraction, and
/// arrays/objects as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => display_number(n),
        other => other.to_string(),
    }
}

fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Interpret the raw text of an expected value.
///
/// `"quoted"` is a string, `true`/`false` booleans, then integer, then float,
/// and anything else is taken verbatim as a string.
pub fn parse_expected(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(raw.trim_matches('"').to_string());
    }

    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }

    Value::String(raw.to_string())
}

/// Direct equality first, then equality of the default string forms, so
/// `42 == "42"` and `true == "true"`.
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    actual == expected || display_value(actual) == display_value(expected)
}

/// Apply a transform chain to a stringified value
pub fn apply_transforms(value: &str, transforms: &[String]) -> Result<String> {
    let mut result = value.to_string();
    for transform in transforms {
        result = match transform.as_str() {
            "base64" => decode_base64(&result)?,
            other => return Err(Error::Transform(format!("unknown transform: {other}"))),
        };
    }
    Ok(result)
}

fn decode_base64(value: &str) -> Result<String> {
    let engines = [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD];
    let mut last_error = None;
    for engine in engines {
        match engine.decode(value) {
            Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => last_error = Some(e),
        }
    }

    let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(Error::Transform(format!(
        "base64 decode failed for value {value:?}: {reason}"
    )))
}
