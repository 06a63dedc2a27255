//! Summary line of a `tree` listing

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Counts from the last line of a `tree --du` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    /// Number of directories
    pub total_directories: u64,
    /// Number of files
    pub total_files: u64,
    /// Size as printed by `tree`, verbatim
    pub reported_size: Option<String>,
}

impl TreeSummary {
    /// Find the summary line in a listing, searching from the end
    pub fn parse(listing: &str) -> Option<Self> {
        listing.lines().rev().find_map(parse_summary_line)
    }

    /// Read and parse a listing file; `None` if unreadable or no summary
    pub fn from_file(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(listing) => Self::parse(&listing),
            Err(e) => {
                tracing::debug!("No tree listing at {}: {}", path.display(), e);
                None
            }
        }
    }
}

// Accepts "N directories, M files", "S used in N directories, M files"
// and "N directories, M files, S".
fn parse_summary_line(line: &str) -> Option<TreeSummary> {
    let line = line.trim();
    let dir_pos = line.find(" director")?;
    let head = &line[..dir_pos];
    let total_directories = head.rsplit(' ').next()?.parse().ok()?;

    let (_, after_dirs) = line[dir_pos..].split_once(',')?;
    let (count, tail) = after_dirs.trim_start().split_once(' ')?;
    let total_files = count.parse().ok()?;
    if !tail.starts_with("file") {
        return None;
    }

    let reported_size = head
        .find(" used in")
        .map(|idx| head[..idx].trim().to_string())
        .or_else(|| tail.split_once(',').map(|(_, s)| s.trim().to_string()))
        .filter(|s| !s.is_empty());

    Some(TreeSummary {
        total_directories,
        total_files,
        reported_size,
    })
}
