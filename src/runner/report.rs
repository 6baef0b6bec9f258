//! Results handed to reporters

use std::path::PathBuf;
use std::time::Duration;

use crate::common::Error;

/// Outcome of one test
#[derive(Debug)]
pub struct ExecutionResult {
    /// Position of the file in the run
    pub file_index: usize,
    /// Position of the test in its file
    pub test_index: usize,
    pub file: PathBuf,
    pub name: String,
    pub error: Option<Error>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// All results of one file, in document order
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub results: Vec<ExecutionResult>,
    /// Sum of test durations when sequential, the longest test when parallel
    pub duration: Duration,
}

impl FileReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// A finished run
#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl RunReport {
    pub fn results(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.files.iter().flat_map(|f| f.results.iter())
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.results.len()).sum()
    }

    pub fn passed(&self) -> usize {
        self.files.iter().map(FileReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}
