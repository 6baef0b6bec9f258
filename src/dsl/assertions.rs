//! Assertion and Save section compilers
//!
//! Both sections start at a header line (`Assert:`/`Asserts:`,
//! `Save:`/`Saves:`) and consume `- ` bullets until the first non-bullet
//! line. Blank lines are skipped. Bullets that match no grammar are ignored.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{Assertion, FieldRef, SaveField};

static ASSERT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Asserts?:[ \t\r]*$").unwrap());
static SAVE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Saves?:[ \t\r]*$").unwrap());

static BODY_CONTAINS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Body contains `([^`]+)`").unwrap());
static FIELD_EQUALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Field `([^`]+)` equals `([^`]+)`").unwrap());
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Duration|Time) less than (.+)$").unwrap());
static BODY_MATCHES_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Body matches file `([^`]+)`").unwrap());
static PARTIAL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*\n(.+?)```").unwrap());

static SAVE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Field `([^`]+)` as `([^`]+)`").unwrap());

const PARTIAL_HEADER: &str = "Body partially matches:";
const PARTIAL_MARKER: &str = ">>";

/// Lines of the section that starts after the first `header` match
fn section_lines<'a>(content: &'a str, header: &Regex) -> Option<Vec<&'a str>> {
    let found = header.find(content)?;
    Some(content[found.end()..].lines().collect())
}

/// Compile the Assert section of a test block.
///
/// `base_dir` is the directory of the test file; `Body matches file` paths are
/// resolved against it.
pub fn parse_assertions(content: &str, base_dir: &Path) -> Vec<Assertion> {
    let mut assertions = Vec::new();
    let Some(lines) = section_lines(content, &ASSERT_HEADER) else {
        return assertions;
    };

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        if line.is_empty() {
            continue;
        }
        let Some(line) = line.strip_prefix("- ") else {
            break;
        };

        if let Some(expected) = line.strip_prefix("Status is ") {
            assertions.push(Assertion::Status {
                expected: expected.to_string(),
            });
        } else if let Some(caps) = BODY_CONTAINS.captures(line) {
            assertions.push(Assertion::BodyContains {
                field: FieldRef::parse(&caps[1]),
            });
        } else if let Some(caps) = FIELD_EQUALS.captures(line) {
            assertions.push(Assertion::FieldEquals {
                field: FieldRef::parse(&caps[1]),
                expected: caps[2].to_string(),
            });
        } else if let Some(caps) = DURATION.captures(line) {
            assertions.push(Assertion::Duration {
                limit: caps[1].to_string(),
            });
        } else if let Some(caps) = BODY_MATCHES_FILE.captures(line) {
            assertions.push(Assertion::BodyMatchesFile {
                path: base_dir.join(&caps[1]),
            });
        } else if line == PARTIAL_HEADER {
            let remaining = lines[i..].join("\n");
            let Some(caps) = PARTIAL_BLOCK.captures(&remaining) else {
                continue;
            };

            let fragments = marked_fragments(&caps[1]);
            if !fragments.is_empty() {
                assertions.push(Assertion::BodyPartialMatch { fragments });
            }
            i = skip_fenced_block(&lines, i);
        }
    }

    assertions
}

/// Extract `>>` lines from a partial-match code block
fn marked_fragments(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.trim().strip_prefix(PARTIAL_MARKER))
        .map(|marked| marked.trim().trim_end_matches(',').trim_end().to_string())
        .filter(|marked| !marked.is_empty())
        .collect()
}

/// Index of the line after the closing fence of the block that opens at or after `start`
fn skip_fenced_block(lines: &[&str], start: usize) -> usize {
    let Some(open) = (start..lines.len()).find(|&j| lines[j].contains("```")) else {
        return start;
    };
    match (open + 1..lines.len()).find(|&k| lines[k].contains("```")) {
        Some(close) => close + 1,
        None => start,
    }
}

/// Compile the Save section of a test block
pub fn parse_save_fields(content: &str) -> Vec<SaveField> {
    let Some(lines) = section_lines(content, &SAVE_HEADER) else {
        return Vec::new();
    };

    let mut saves = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(line) = line.strip_prefix("- ") else {
            break;
        };
        if let Some(caps) = SAVE_FIELD.captures(line) {
            saves.push(SaveField {
                field: caps[1].to_string(),
                variable: caps[2].to_string(),
            });
        }
    }
    saves
}
