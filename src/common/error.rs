//! Error types for the test runner
//!
//! Every failure is local to the test that produced it. The `Display` output of
//! each variant is the one-line message shown next to a failed test.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Request Errors ===
    #[error("failed to create request: {0}")]
    RequestBuild(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response: {0}")]
    ResponseRead(String),

    // === Wait/Retry Errors ===
    #[error("wait for {condition} failed: {observed} after {attempts} attempts")]
    WaitTimeout {
        condition: String,
        observed: String,
        attempts: u32,
    },

    // === Assertion Errors ===
    #[error("status assertion failed: expected {expected}, got {actual}{}", preview_suffix(.preview))]
    StatusMismatch {
        expected: u16,
        actual: u16,
        preview: Option<String>,
    },

    #[error("{kind} assertion failed: {message}")]
    Assertion {
        kind: AssertionKind,
        message: String,
    },

    #[error("invalid {what} in assertion: {value}")]
    InvalidAssertion { what: &'static str, value: String },

    #[error("{0}")]
    Transform(String),

    // === Save Errors ===
    #[error("save field failed: {0}")]
    Save(#[source] PathError),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("{0}")]
    Discovery(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

fn preview_suffix(preview: &Option<String>) -> String {
    match preview {
        Some(body) => format!("\n       Response: {body}"),
        None => String::new(),
    }
}

/// Failure while walking a dot path through a JSON document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("field '{path}' not found")]
    NotFound { path: String },

    #[error("cannot traverse into non-object at '{segment}'")]
    NotTraversable { segment: String },
}

/// Assertion family, used to prefix assertion failure messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    Status,
    BodyContains,
    FieldEquals,
    Duration,
    BodyMatchesFile,
    BodyPartialMatch,
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssertionKind::Status => "status",
            AssertionKind::BodyContains => "body contains",
            AssertionKind::FieldEquals => "field equals",
            AssertionKind::Duration => "duration",
            AssertionKind::BodyMatchesFile => "body matches file",
            AssertionKind::BodyPartialMatch => "body partial match",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Create an assertion failure of the given kind
    pub fn assertion(kind: AssertionKind, message: impl Into<String>) -> Self {
        Self::Assertion {
            kind,
            message: message.into(),
        }
    }

    /// Create a wait timeout error
    pub fn wait_timeout(condition: impl Into<String>, observed: impl Into<String>, attempts: u32) -> Self {
        Self::WaitTimeout {
            condition: condition.into(),
            observed: observed.into(),
            attempts,
        }
    }

    /// Create a file read error carrying the resolved path
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// The failure message without any attached response preview
    pub fn headline(&self) -> String {
        match self {
            Error::StatusMismatch {
                expected, actual, ..
            } => format!("status assertion failed: expected {expected}, got {actual}"),
            other => other.to_string(),
        }
    }
}
