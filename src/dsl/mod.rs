//! Markdown test file grammar
//!
//! A test file is plain markdown. Optional frontmatter sets a root URL and
//! default headers; every `## ` heading opens one test:
//!
//! ````text
//! ---
//! root: https://api.example.com
//! ---
//!
//! ## Create user
//! POST /users
//! - Authorization: Bearer {{token}}
//!
//! ```json
//! {"name": "ada"}
//! ```
//!
//! Assert:
//! - Status is 201
//! - Field `json.name` equals `"ada"`
//!
//! Save:
//! - Field `json.id` as `user_id`
//! ````
//!
//! Parsing never fails: lines that match no grammar are ignored.

mod assertions;
mod block;
mod duration;
mod frontmatter;
mod types;

pub use assertions::{parse_assertions, parse_save_fields};
pub use block::{parse_block, resolve_url};
pub use duration::parse_duration;
pub use frontmatter::extract as extract_frontmatter;
pub use types::*;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::common::{Error, Result};

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());

/// Parse every test in a markdown document.
///
/// `base_dir` is the directory of the file the text came from; `FILE:` bodies
/// and `Body matches file` paths are resolved against it.
pub fn parse_tests(content: &str, base_dir: &Path) -> Vec<TestDefinition> {
    let (defaults, content) = extract_frontmatter(content);

    let headings: Vec<_> = HEADING.captures_iter(content).collect();
    let mut tests = Vec::with_capacity(headings.len());

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(content.len(), |next| next.start());
        let block = &content[whole.end()..end];
        let name = name.as_str().trim_end();

        match parse_block(name, block, &defaults, base_dir) {
            Some(test) => tests.push(test),
            None => tracing::debug!(test = name, "Skipping block without a request line"),
        }
    }

    tests
}

/// Read and parse a test file
pub fn parse_file(path: &Path) -> Result<TestFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let tests = parse_tests(&content, base_dir);
    tracing::debug!(file = %path.display(), tests = tests.len(), "Parsed test file");

    Ok(TestFile {
        path: path.to_path_buf(),
        tests,
    })
}
