//! CLI argument definitions

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Markdown test file, or a directory searched recursively for *.md files
    pub target: PathBuf,

    /// Run all tests concurrently; saved variables are not shared in this mode
    #[arg(long)]
    pub parallel: bool,

    /// Only print failures and the summary
    #[arg(long, short)]
    pub quiet: bool,

    /// Run only the N-th test (1-based, counted across all files)
    #[arg(long, value_name = "N")]
    pub only: Option<usize>,

    /// Maximum concurrent tests in parallel mode (default: CPU count)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Configuration file (default: the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
