//! Test block parsing
//!
//! A block is the text under one `## ` heading. It carries a request line,
//! option bullets directly after it, an optional `json`/`form` body block,
//! and Assert/Save sections.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::assertions::{parse_assertions, parse_save_fields};
use super::duration::parse_duration;
use super::types::{Defaults, Method, TestDefinition, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};

static REQUEST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(GET|POST|PUT|PATCH|DELETE)\s+(\S+)").unwrap());
static WAIT_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^-\s+Wait until status is (\d+)$").unwrap());
static WAIT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^-\s+Wait until field `([^`]+)` equals `([^`]+)`$").unwrap()
});
static RETRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^-\s+Retry (\d+) times every (.+)$").unwrap());
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-\s+([^:]+):\s*(.+)$").unwrap());
static BODY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(json|form)\s*\n(.+?)```").unwrap());

const FILE_PREFIX: &str = "FILE:";

/// Resolve a request target against the file root
pub fn resolve_url(target: &str, root: Option<&str>) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    match root {
        Some(root) if target.starts_with('/') => format!("{root}{target}"),
        Some(root) => format!("{root}/{target}"),
        None => target.to_string(),
    }
}

/// Parse one test block. Returns `None` when the block has no request line.
pub fn parse_block(
    name: &str,
    content: &str,
    defaults: &Defaults,
    base_dir: &Path,
) -> Option<TestDefinition> {
    let lines: Vec<&str> = content.lines().collect();

    let (request_idx, method, target) = lines.iter().enumerate().find_map(|(i, line)| {
        let caps = REQUEST_LINE.captures(line)?;
        let method = Method::parse(&caps[1])?;
        Some((i, method, caps[2].to_string()))
    })?;

    let mut test = TestDefinition::new(name, resolve_url(&target, defaults.root.as_deref()));
    test.method = method;

    for (key, value) in &defaults.headers {
        set_header(&mut test, key, value);
    }

    parse_options(&mut test, &lines[request_idx + 1..]);
    parse_body(&mut test, content, base_dir);

    test.assertions = parse_assertions(content, base_dir);
    test.saves = parse_save_fields(content);

    Some(test)
}

fn set_header(test: &mut TestDefinition, name: &str, value: &str) {
    test.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    test.headers.insert(name.to_string(), value.to_string());
    if name.eq_ignore_ascii_case("Content-Type") {
        test.content_type = Some(value.to_string());
    }
}

/// Scan the bullets after the request line.
///
/// Scanning ends at the first non-blank line that is none of: wait-for-status,
/// wait-for-field, retry, or `Name: value` header.
fn parse_options(test: &mut TestDefinition, lines: &[&str]) {
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = WAIT_STATUS.captures(line) {
            if let Ok(status) = caps[1].parse() {
                test.wait.status = Some(status);
            }
        } else if let Some(caps) = WAIT_FIELD.captures(line) {
            test.wait.field = Some((caps[1].to_string(), caps[2].to_string()));
        } else if let Some(caps) = RETRY.captures(line) {
            if let Ok(max) = caps[1].parse::<u32>() {
                test.retry.max_attempts = Some(max).filter(|n| *n > 0);
            }
            if let Some(delay) = parse_duration(&caps[2]) {
                test.retry.delay = Some(delay).filter(|d| *d > Duration::ZERO);
            }
        } else if let Some(caps) = HEADER.captures(line) {
            let name = caps[1].trim().to_string();
            let value = caps[2].trim().to_string();
            set_header(test, &name, &value);
        } else {
            break;
        }
    }
}

/// Read the first `json`/`form` fenced block, loading `FILE:` references
fn parse_body(test: &mut TestDefinition, content: &str, base_dir: &Path) {
    let Some(caps) = BODY_BLOCK.captures(content) else {
        return;
    };

    let mut body = caps[2].trim().to_string();
    if let Some(reference) = body.strip_prefix(FILE_PREFIX) {
        let path = base_dir.join(reference.trim());
        match std::fs::read(&path) {
            Ok(payload) => body = String::from_utf8_lossy(&payload).into_owned(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read body file, sending reference as-is");
            }
        }
    }

    let default_type = match &caps[1] {
        "form" => FORM_CONTENT_TYPE,
        _ => JSON_CONTENT_TYPE,
    };
    test.body = body;
    if test.content_type.is_none() {
        test.content_type = Some(default_type.to_string());
    }
}
