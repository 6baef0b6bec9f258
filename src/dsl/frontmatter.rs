//! Frontmatter extraction
//!
//! A test file may open with a `---` delimited block:
//! ```text
//! ---
//! root: https://api.example.com/
//! headers:
//!   Authorization: Bearer abc
//! ---
//! ```
//! Only `root:` and indented entries under `headers:` are read. A block
//! without a closing delimiter is not frontmatter at all.

use super::types::Defaults;

const DELIMITER: &str = "---";

/// Split `content` into file defaults and the text after the frontmatter.
///
/// Malformed or absent frontmatter yields empty defaults and the original text.
pub fn extract(content: &str) -> (Defaults, &str) {
    let mut defaults = Defaults::default();

    let trimmed = content.trim_start();
    let mut lines = trimmed.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim() == DELIMITER => {}
        _ => return (defaults, content),
    }

    let mut offset = content.len() - trimmed.len();
    offset += trimmed.split_inclusive('\n').next().map_or(0, str::len);

    let mut block = Vec::new();
    let mut remainder = None;
    for line in lines {
        offset += line.len();
        if line.trim() == DELIMITER {
            remainder = Some(&content[offset..]);
            break;
        }
        block.push(line.trim_end_matches(['\n', '\r']));
    }

    let Some(remainder) = remainder else {
        return (defaults, content);
    };

    let mut in_headers = false;
    for line in block {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(root) = trimmed.strip_prefix("root:") {
            let root = root.trim().trim_end_matches('/');
            defaults.root = (!root.is_empty()).then(|| root.to_string());
            in_headers = false;
            continue;
        }

        if trimmed == "headers:" {
            in_headers = true;
            continue;
        }

        if in_headers && (line.starts_with("  ") || line.starts_with('\t')) {
            if let Some((key, value)) = trimmed.split_once(':') {
                defaults
                    .headers
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        } else {
            in_headers = false;
        }
    }

    (defaults, remainder)
}
