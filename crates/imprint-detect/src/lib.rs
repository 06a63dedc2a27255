//! # Imprint Detect
//!
//! Thin adapter over the macOS `diskutil` command: the human-readable disk
//! listing shown before the operator picks a disk, the `info -plist`
//! properties of one disk, its volume name, and whether it is mounted.
//!
//! Parsing is pure and platform-independent; running `diskutil` is only
//! available on macOS and reports [`DetectError::UnsupportedPlatform`]
//! elsewhere.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        mod macos;
        use macos as platform;
    } else {
        mod unsupported;
        use unsupported as platform;
    }
}

/// Disk query errors
#[derive(Error, Debug)]
pub enum DetectError {
    /// `diskutil` could not be run or exited unsuccessfully
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// `diskutil` output could not be interpreted
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No `diskutil` on this platform
    #[error("Disk queries are only supported on macOS")]
    UnsupportedPlatform,
}

/// Result type for disk queries
pub type Result<T> = std::result::Result<T, DetectError>;

/// One whole disk with its raw properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskEntry {
    /// Disk identifier (e.g. `disk4`)
    pub identifier: String,
    /// Flat `diskutil info` properties
    pub properties: BTreeMap<String, String>,
}

/// Output of `diskutil list`, for display
pub fn list_disks_text() -> Result<String> {
    platform::list_disks_text()
}

/// Identifiers of all whole disks
pub fn whole_disks() -> Result<Vec<String>> {
    platform::whole_disks()
}

/// Flat properties from `diskutil info -plist /dev/<disk_id>`
pub fn disk_properties(disk_id: &str) -> Result<BTreeMap<String, String>> {
    platform::disk_properties(disk_id)
}

/// Every whole disk with its properties; disks that fail to answer are skipped
pub fn list_disks() -> Result<Vec<DiskEntry>> {
    let mut disks = Vec::new();
    for identifier in whole_disks()? {
        match disk_properties(&identifier) {
            Ok(properties) => disks.push(DiskEntry {
                identifier,
                properties,
            }),
            Err(e) => tracing::debug!("Skipping {}: {}", identifier, e),
        }
    }
    Ok(disks)
}

/// Whether the disk's volume is currently mounted
pub fn is_mounted(disk_id: &str) -> Result<bool> {
    platform::info_text(disk_id).map(|text| parse_mounted(&text))
}

// ============================================================================
// Parsers
// ============================================================================

/// Flatten a `diskutil info -plist` document into key/value strings
///
/// Reads one `<key>` followed by one scalar value per line. Booleans become
/// `"true"`/`"false"`; keys whose value is a dict or array are dropped and
/// the nested scalars are flattened into the same map.
pub fn parse_plist_properties(plist: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut current_key: Option<String> = None;

    for line in plist.lines() {
        let trimmed = line.trim();

        if let Some(key) = element_text(trimmed, "key") {
            current_key = Some(key.to_string());
        } else if let Some(key) = current_key.take() {
            let value = if let Some(text) = element_text(trimmed, "string") {
                unescape(text)
            } else if let Some(number) = element_text(trimmed, "integer") {
                number.to_string()
            } else if let Some(number) = element_text(trimmed, "real") {
                number.to_string()
            } else if trimmed == "<string/>" {
                String::new()
            } else if trimmed == "<true/>" {
                "true".to_string()
            } else if trimmed == "<false/>" {
                "false".to_string()
            } else {
                continue;
            };
            properties.insert(key, value);
        }
    }

    tracing::debug!("Parsed {} disk properties", properties.len());
    properties
}

/// Whole disk identifiers from a `diskutil list -plist` document
pub fn parse_whole_disks(plist: &str) -> Result<Vec<String>> {
    let mut disks = Vec::new();
    let mut in_whole_disks = false;
    let mut in_array = false;

    for line in plist.lines() {
        let trimmed = line.trim();

        if trimmed == "<key>WholeDisks</key>" {
            in_whole_disks = true;
            continue;
        }
        if !in_whole_disks {
            continue;
        }
        match trimmed {
            "<array>" => in_array = true,
            "</array>" | "<array/>" => break,
            _ if in_array => {
                if let Some(disk) = element_text(trimmed, "string") {
                    disks.push(disk.to_string());
                }
            }
            _ => {}
        }
    }

    if disks.is_empty() {
        return Err(DetectError::ParseError(
            "No disks found in diskutil output".to_string(),
        ));
    }
    Ok(disks)
}

/// Whether plain `diskutil info` output reports the volume as mounted
pub fn parse_mounted(info: &str) -> bool {
    info.lines().any(|line| {
        line.trim()
            .strip_prefix("Mounted:")
            .is_some_and(|value| value.trim() == "Yes")
    })
}

fn element_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.strip_prefix('<')?
        .strip_prefix(tag)?
        .strip_prefix('>')?
        .strip_suffix('>')?
        .strip_suffix(tag)?
        .strip_suffix("</")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// UNIT TESTS
// ============================================================================
