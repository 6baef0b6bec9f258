//! Assertion validation against a finished response

use std::time::Duration;

use serde_json::{Map, Value};

use crate::common::{format_duration, AssertionKind, Error, Result};
use crate::dsl::{parse_duration, Assertion, FieldRef};

use super::values::{apply_transforms, display_value, parse_expected, values_equal};
use super::vars::extract;

/// What the assertions get to look at
#[derive(Debug)]
pub struct ResponseView<'a> {
    pub status: u16,
    pub body: &'a [u8],
    /// The body parsed as a JSON object, if it was one
    pub json: Option<&'a Map<String, Value>>,
    pub duration: Duration,
    /// Characters of body attached to status failures
    pub preview_chars: usize,
}

/// Parse a response body as a JSON object; anything else yields `None`
pub fn parse_json_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Check every assertion in order, stopping at the first failure
pub fn validate_all(assertions: &[Assertion], response: &ResponseView<'_>) -> Result<()> {
    for assertion in assertions {
        validate(assertion, response)?;
    }
    Ok(())
}

/// Check a single assertion
pub fn validate(assertion: &Assertion, response: &ResponseView<'_>) -> Result<()> {
    match assertion {
        Assertion::Status { expected } => check_status(expected, response),
        Assertion::BodyContains { field } => check_body_contains(field, response),
        Assertion::FieldEquals { field, expected } => check_field_equals(field, expected, response),
        Assertion::Duration { limit } => check_duration(limit, response),
        Assertion::BodyMatchesFile { path } => check_body_matches_file(path, response),
        Assertion::BodyPartialMatch { fragments } => check_partial_match(fragments, response),
    }
}

fn require_json<'a>(kind: AssertionKind, response: &ResponseView<'a>) -> Result<&'a Map<String, Value>> {
    response
        .json
        .ok_or_else(|| Error::assertion(kind, "response is not valid JSON"))
}

fn check_status(expected: &str, response: &ResponseView<'_>) -> Result<()> {
    let expected: u16 = expected.trim().parse().map_err(|_| Error::InvalidAssertion {
        what: "status code",
        value: expected.to_string(),
    })?;
    if response.status == expected {
        return Ok(());
    }

    Err(Error::StatusMismatch {
        expected,
        actual: response.status,
        preview: body_preview(response.body, response.preview_chars),
    })
}

/// Body text cut to `limit` characters, `None` when the body is empty
fn body_preview(body: &[u8], limit: usize) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(limit) {
        Some((cut, _)) => Some(format!("{}...", &text[..cut])),
        None => Some(text.into_owned()),
    }
}

fn check_body_contains(field: &FieldRef, response: &ResponseView<'_>) -> Result<()> {
    let kind = AssertionKind::BodyContains;
    let json = require_json(kind, response)?;
    let not_found = || Error::assertion(kind, format!("field '{}' not found in response", field.path));

    if field.transforms.is_empty() {
        return json.get(&field.path).map(|_| ()).ok_or_else(not_found);
    }

    let value = extract(json, &field.path).map_err(|_| not_found())?;
    let transformed = apply_transforms(&display_value(value), &field.transforms)
        .map_err(|e| Error::assertion(kind, e.to_string()))?;
    if transformed.is_empty() {
        return Err(Error::assertion(
            kind,
            format!("field '{}' is empty after transform", field.path),
        ));
    }
    Ok(())
}

fn check_field_equals(field: &FieldRef, expected: &str, response: &ResponseView<'_>) -> Result<()> {
    let kind = AssertionKind::FieldEquals;
    let json = require_json(kind, response)?;
    let actual = extract(json, &field.path).map_err(|e| Error::assertion(kind, e.to_string()))?;
    let expected = parse_expected(expected);

    if field.transforms.is_empty() {
        if values_equal(actual, &expected) {
            return Ok(());
        }
        return Err(Error::assertion(
            kind,
            format!(
                "field '{}' expected {}, got {}",
                field,
                display_value(&expected),
                display_value(actual)
            ),
        ));
    }

    let transformed = apply_transforms(&display_value(actual), &field.transforms)
        .map_err(|e| Error::assertion(kind, e.to_string()))?;
    if values_equal(&Value::String(transformed.clone()), &expected) {
        return Ok(());
    }
    Err(Error::assertion(
        kind,
        format!(
            "field '{}' expected {}, got {} (after transform)",
            field,
            display_value(&expected),
            transformed
        ),
    ))
}

fn check_duration(limit: &str, response: &ResponseView<'_>) -> Result<()> {
    let max = parse_duration(limit).ok_or_else(|| Error::InvalidAssertion {
        what: "duration",
        value: limit.to_string(),
    })?;
    if response.duration > max {
        return Err(Error::assertion(
            AssertionKind::Duration,
            format!(
                "expected < {}, got {}",
                format_duration(max),
                format_duration(response.duration)
            ),
        ));
    }
    Ok(())
}

fn check_body_matches_file(path: &std::path::Path, response: &ResponseView<'_>) -> Result<()> {
    let kind = AssertionKind::BodyMatchesFile;
    let expected = std::fs::read(path).map_err(|e| {
        Error::assertion(kind, format!("could not read file '{}': {}", path.display(), e))
    })?;
    let mismatch = || {
        Error::assertion(
            kind,
            format!("response does not match file '{}'", path.display()),
        )
    };

    let Ok(expected_json) = serde_json::from_slice::<Value>(&expected) else {
        return if response.body == expected.as_slice() {
            Ok(())
        } else {
            Err(mismatch())
        };
    };

    let actual_json = serde_json::from_slice::<Value>(response.body)
        .map_err(|_| Error::assertion(kind, "response is not valid JSON"))?;
    if expected_json.to_string() == actual_json.to_string() {
        Ok(())
    } else {
        Err(mismatch())
    }
}

fn check_partial_match(fragments: &[String], response: &ResponseView<'_>) -> Result<()> {
    let kind = AssertionKind::BodyPartialMatch;
    let json = require_json(kind, response)?;

    for fragment in fragments {
        let fragment = fragment.trim().trim_end_matches(',');
        if fragment.is_empty() {
            continue;
        }

        let parsed: Map<String, Value> = serde_json::from_str(&format!("{{{fragment}}}"))
            .map_err(|e| Error::assertion(kind, format!("invalid JSON line '{}': {}", fragment, e)))?;

        for (field, expected) in &parsed {
            let actual = extract(json, field).map_err(|e| Error::assertion(kind, e.to_string()))?;
            if !values_equal(actual, expected) {
                return Err(Error::assertion(
                    kind,
                    format!(
                        "field '{}' expected {}, got {}",
                        field,
                        display_value(expected),
                        display_value(actual)
                    ),
                ));
            }
        }
    }
    Ok(())
}
