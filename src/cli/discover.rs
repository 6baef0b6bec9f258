//! Test file discovery

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::common::{Error, Result};
use crate::dsl::{self, TestFile};

const TEST_FILE_EXTENSION: &str = "md";

/// Files found under a target
#[derive(Debug, Default)]
pub struct Discovered {
    /// Files with at least one test, sorted by path
    pub files: Vec<TestFile>,
    /// Markdown files looked at, including the ones without tests
    pub scanned: usize,
}

/// Parse the file at `path`, or every `*.md` file below it when it is a
/// directory. Files are sorted by path and files without tests are dropped.
pub fn collect_test_files(path: &Path) -> Result<Discovered> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::Discovery(format!("cannot access '{}': {}", path.display(), e)))?;

    let paths = if metadata.is_dir() {
        let mut paths = walk(path)?;
        paths.sort_by_key(|p| p.to_string_lossy().into_owned());
        paths
    } else {
        vec![path.to_path_buf()]
    };

    let scanned = paths.len();
    let mut files = Vec::with_capacity(scanned);
    for path in paths {
        let file = dsl::parse_file(&path)?;
        if file.tests.is_empty() {
            tracing::debug!(file = %path.display(), "No tests in file, skipping");
            continue;
        }
        files.push(file);
    }
    Ok(Discovered { files, scanned })
}

/// Every `*.md` below `dir`. Symlinked directories are not descended into.
fn walk(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| Error::Discovery(format!("cannot read '{}': {}", dir.display(), e)))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == TEST_FILE_EXTENSION) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Keep only the `n`-th test (1-based) counted across all files in order
pub fn select_only(files: Vec<TestFile>, n: usize) -> Result<Vec<TestFile>> {
    let total: usize = files.iter().map(|f| f.tests.len()).sum();
    if n == 0 || n > total {
        return Err(Error::Discovery(format!(
            "--only {} is out of range: found {} tests",
            n, total
        )));
    }

    let mut remaining = n - 1;
    for mut file in files {
        if remaining < file.tests.len() {
            let test = file.tests.swap_remove(remaining);
            file.tests = vec![test];
            return Ok(vec![file]);
        }
        remaining -= file.tests.len();
    }
    Err(Error::Internal(format!("test {} not found after counting {}", n, total)))
}
