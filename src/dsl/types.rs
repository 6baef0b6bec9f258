//! Typed test definitions produced by the parser
//!
//! Everything here is immutable once parsed. Expected values stay as the raw
//! text from the file; their type is resolved when the assertion is validated.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::AssertionKind;

/// Content type applied to `json` body blocks
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type applied to `form` body blocks
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP methods accepted on a request line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file defaults from the frontmatter block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Root URL, trailing slash removed
    pub root: Option<String>,
    /// Headers applied to every test in the file
    pub headers: BTreeMap<String, String>,
}

/// A field path with an optional transform chain, e.g. `data.token | base64`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub path: String,
    pub transforms: Vec<String>,
}

impl FieldRef {
    /// Split `path | t1 | t2` into the path and its transform names
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('|');
        let path = parts.next().unwrap_or_default().trim().to_string();
        let transforms = parts
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self { path, transforms }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for transform in &self.transforms {
            write!(f, " | {transform}")?;
        }
        Ok(())
    }
}

/// A single check against the final response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    /// `Status is <token>`
    Status { expected: String },
    /// ``Body contains `field` ``
    BodyContains { field: FieldRef },
    /// ``Field `path` equals `value` ``
    FieldEquals { field: FieldRef, expected: String },
    /// `Duration less than <dur>` / `Time less than <dur>`
    Duration { limit: String },
    /// ``Body matches file `path` ``, path already resolved against the test file
    BodyMatchesFile { path: PathBuf },
    /// `Body partially matches:` with the `>>`-marked fragments
    BodyPartialMatch { fragments: Vec<String> },
}

impl Assertion {
    pub fn kind(&self) -> AssertionKind {
        match self {
            Assertion::Status { .. } => AssertionKind::Status,
            Assertion::BodyContains { .. } => AssertionKind::BodyContains,
            Assertion::FieldEquals { .. } => AssertionKind::FieldEquals,
            Assertion::Duration { .. } => AssertionKind::Duration,
            Assertion::BodyMatchesFile { .. } => AssertionKind::BodyMatchesFile,
            Assertion::BodyPartialMatch { .. } => AssertionKind::BodyPartialMatch,
        }
    }
}

/// ``Field `path` as `name` `` in a Save section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveField {
    pub field: String,
    pub variable: String,
}

/// Pre-assertion polling criteria. Both, when present, must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitCondition {
    pub status: Option<u16>,
    pub field: Option<(String, String)>,
}

impl WaitCondition {
    pub fn is_active(&self) -> bool {
        self.status.is_some() || self.field.is_some()
    }
}

/// Retry settings declared by the test; `None` means the configured default
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Option<Duration>,
    pub max_attempts: Option<u32>,
}

/// A fully parsed test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    pub name: String,
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub content_type: Option<String>,
    pub assertions: Vec<Assertion>,
    pub saves: Vec<SaveField>,
    pub wait: WaitCondition,
    pub retry: RetryPolicy,
}

impl TestDefinition {
    /// An empty GET test with the given name and URL
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: Method::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            body: String::new(),
            content_type: None,
            assertions: Vec::new(),
            saves: Vec::new(),
            wait: WaitCondition::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// All tests parsed from one markdown file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    pub path: PathBuf,
    pub tests: Vec<TestDefinition>,
}
