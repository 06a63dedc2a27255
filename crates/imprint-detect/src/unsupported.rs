//! Fallback for platforms without `diskutil`

use super::{DetectError, Result};
use std::collections::BTreeMap;

pub(crate) fn list_disks_text() -> Result<String> {
    Err(DetectError::UnsupportedPlatform)
}

pub(crate) fn whole_disks() -> Result<Vec<String>> {
    Err(DetectError::UnsupportedPlatform)
}

pub(crate) fn disk_properties(_disk_id: &str) -> Result<BTreeMap<String, String>> {
    Err(DetectError::UnsupportedPlatform)
}

pub(crate) fn info_text(_disk_id: &str) -> Result<String> {
    Err(DetectError::UnsupportedPlatform)
}
