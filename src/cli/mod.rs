//! CLI command handling
//!
//! Loads configuration, discovers test files, runs them and prints the report.

mod discover;

pub use discover::{collect_test_files, select_only, Discovered};

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::commands::RunArgs;
use crate::common::config::Config;
use crate::common::{format_duration, Result};
use crate::dsl::TestFile;
use crate::engine::{Executor, ReqwestTransport};
use crate::runner::{ExecutionResult, FileReport, Reporter, RunReport, Scheduler};

/// Run the tests named by `args`. Returns whether every test passed.
pub async fn run(args: RunArgs) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if args.workers.is_some() {
        config.runner.workers = args.workers;
    }

    let discovered = collect_test_files(&args.target)?;
    if discovered.scanned == 0 {
        println!("No test files found.");
        return Ok(true);
    }
    let mut files = discovered.files;
    if files.is_empty() {
        println!("No tests found.");
        return Ok(true);
    }
    if let Some(n) = args.only {
        files = select_only(files, n)?;
    }

    println!("{}\n", run_header(&files, &args.target));

    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let executor = Executor::new(transport, config.retry.clone(), config.runner.preview_chars);
    let scheduler = Scheduler::new(executor);
    let mut reporter = ConsoleReporter::new(files.len() > 1, args.quiet);

    let report = if args.parallel {
        let workers = config.runner.worker_count();
        tracing::debug!(workers, "Running tests in parallel");
        scheduler.run_parallel(&files, workers, &mut reporter).await
    } else {
        scheduler.run_sequential(&files, &mut reporter).await
    };

    reporter.finish(&report);
    Ok(report.success())
}

/// "<file> (<n> tests)" for one file, "<target> (<f> files, <n> tests)" otherwise
fn run_header(files: &[TestFile], target: &Path) -> String {
    let total: usize = files.iter().map(|f| f.tests.len()).sum();
    match files {
        [only] => format!("{} ({} tests)", only.path.display(), total),
        _ => format!("{} ({} files, {} tests)", target.display(), files.len(), total),
    }
}

fn summary_line(report: &RunReport) -> String {
    let elapsed = format_duration(report.elapsed);
    if report.success() {
        format!("{} passed in {}", report.passed(), elapsed)
    } else {
        format!(
            "{} passed, {} failed in {}",
            report.passed(),
            report.failed(),
            elapsed
        )
    }
}

/// Prints results to stdout as they arrive
struct ConsoleReporter {
    multi_file: bool,
    quiet: bool,
}

impl ConsoleReporter {
    fn new(multi_file: bool, quiet: bool) -> Self {
        Self { multi_file, quiet }
    }

    fn finish(&self, report: &RunReport) {
        if !self.multi_file {
            println!();
        }
        let summary = summary_line(report);
        if report.success() {
            println!("{}", summary.green());
        } else {
            println!("{}", summary.red());
        }
    }
}

impl Reporter for ConsoleReporter {
    fn file_started(&mut self, file: &TestFile) {
        if self.multi_file && !self.quiet {
            println!("{}", file.path.display().to_string().bold());
        }
    }

    fn test_finished(&mut self, result: &ExecutionResult) {
        let Some(error) = &result.error else {
            if !self.quiet {
                println!("  {} {}", "✓".green(), result.name);
            }
            return;
        };

        if self.quiet && self.multi_file {
            println!(
                "  {} {} {}",
                "✗".red(),
                result.name,
                result.file.display().to_string().dimmed()
            );
        } else {
            println!("  {} {}", "✗".red(), result.name);
        }

        let message = if self.quiet {
            error.headline()
        } else {
            error.to_string()
        };
        println!("    {} {}", "→".red(), message);
    }

    fn file_finished(&mut self, report: &FileReport) {
        if self.multi_file && !self.quiet {
            println!("  {}\n", format_duration(report.duration).dimmed());
        }
    }
}
