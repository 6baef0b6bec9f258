//! Scheduling tests across files
//!
//! Sequential mode runs files in order and tests in document order, sharing a
//! [`VariableStore`] per file. Parallel mode flattens every test into one job
//! list and runs the jobs on tokio tasks bounded by a semaphore; each job gets
//! its own empty store. Either way reporters see results in job order.

mod report;

pub use report::{ExecutionResult, FileReport, RunReport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::common::Error;
use crate::dsl::{TestDefinition, TestFile};
use crate::engine::{Executor, VariableStore};

/// Receives progress while a run is underway
pub trait Reporter {
    fn file_started(&mut self, _file: &TestFile) {}
    fn test_finished(&mut self, _result: &ExecutionResult) {}
    fn file_finished(&mut self, _report: &FileReport) {}
}

/// Reporter that ignores everything
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Runs parsed test files through an [`Executor`]
pub struct Scheduler {
    executor: Executor,
}

impl Scheduler {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Run every file in order, one test at a time
    pub async fn run_sequential(&self, files: &[TestFile], reporter: &mut dyn Reporter) -> RunReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(files.len());

        for (file_index, file) in files.iter().enumerate() {
            reporter.file_started(file);
            let mut vars = VariableStore::new();
            let mut results = Vec::with_capacity(file.tests.len());

            for (test_index, test) in file.tests.iter().enumerate() {
                let started = Instant::now();
                let outcome = self.executor.run(test, &mut vars).await;
                let result = ExecutionResult {
                    file_index,
                    test_index,
                    file: file.path.clone(),
                    name: test.name.clone(),
                    error: outcome.err(),
                    duration: started.elapsed(),
                };
                reporter.test_finished(&result);
                results.push(result);
            }

            let report = FileReport {
                path: file.path.clone(),
                duration: results.iter().map(|r| r.duration).sum(),
                results,
            };
            reporter.file_finished(&report);
            reports.push(report);
        }

        RunReport {
            files: reports,
            elapsed: start.elapsed(),
        }
    }

    /// Run every test concurrently with at most `workers` in flight
    pub async fn run_parallel(
        &self,
        files: &[TestFile],
        workers: usize,
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        tracing::debug!(workers = workers.max(1), "Starting parallel run");

        let mut handles = Vec::new();
        for file in files {
            for test in &file.tests {
                handles.push(tokio::spawn(run_job(
                    self.executor.clone(),
                    semaphore.clone(),
                    test.clone(),
                )));
            }
        }
        let mut outcomes = join_all(handles).await.into_iter();

        let mut reports = Vec::with_capacity(files.len());
        for (file_index, file) in files.iter().enumerate() {
            reporter.file_started(file);
            let mut results = Vec::with_capacity(file.tests.len());

            for (test_index, test) in file.tests.iter().enumerate() {
                let (error, duration) = match outcomes.next() {
                    Some(Ok(outcome)) => outcome,
                    Some(Err(e)) => (Some(Error::Internal(format!("test task failed: {}", e))), Duration::ZERO),
                    None => (Some(Error::Internal("missing test result".to_string())), Duration::ZERO),
                };
                let result = ExecutionResult {
                    file_index,
                    test_index,
                    file: file.path.clone(),
                    name: test.name.clone(),
                    error,
                    duration,
                };
                reporter.test_finished(&result);
                results.push(result);
            }

            let report = FileReport {
                path: file.path.clone(),
                duration: results.iter().map(|r| r.duration).max().unwrap_or_default(),
                results,
            };
            reporter.file_finished(&report);
            reports.push(report);
        }

        RunReport {
            files: reports,
            elapsed: start.elapsed(),
        }
    }
}

/// One parallel job: wait for a permit, then run with a private store
async fn run_job(
    executor: Executor,
    semaphore: Arc<Semaphore>,
    test: TestDefinition,
) -> (Option<Error>, Duration) {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return (Some(Error::Internal("worker pool closed".to_string())), Duration::ZERO);
    };

    let started = Instant::now();
    let mut vars = VariableStore::new();
    let outcome = executor.run(&test, &mut vars).await;
    (outcome.err(), started.elapsed())
}
