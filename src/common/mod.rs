//! Common utilities shared by the library and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{AssertionKind, Error, PathError, Result};

use std::time::Duration;

/// Format a duration the way test reports show it.
/// Sub-second values are whole milliseconds, longer ones are seconds with two decimals.
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
