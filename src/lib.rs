//! marcus - black-box HTTP API tests written as plain markdown
//!
//! The library parses markdown test files into typed definitions, executes
//! them against live endpoints and schedules them sequentially or in a
//! bounded worker pool.

pub mod cli;
pub mod commands;
pub mod common;
pub mod dsl;
pub mod engine;
pub mod runner;

// Re-export commonly used types for tests
pub use common::{Error, Result};
