//! `diskutil` invocations on macOS

use super::{DetectError, Result, parse_plist_properties, parse_whole_disks};
use std::collections::BTreeMap;
use std::process::Command;

fn diskutil(args: &[&str]) -> Result<String> {
    tracing::debug!("Running: diskutil {}", args.join(" "));

    let output = Command::new("diskutil")
        .args(args)
        .output()
        .map_err(|e| DetectError::CommandFailed(format!("diskutil {} failed: {}", args.join(" "), e)))?;

    if !output.status.success() {
        return Err(DetectError::CommandFailed(format!(
            "diskutil {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(crate) fn list_disks_text() -> Result<String> {
    diskutil(&["list"])
}

pub(crate) fn whole_disks() -> Result<Vec<String>> {
    parse_whole_disks(&diskutil(&["list", "-plist"])?)
}

pub(crate) fn disk_properties(disk_id: &str) -> Result<BTreeMap<String, String>> {
    let device = format!("/dev/{disk_id}");
    let properties = parse_plist_properties(&diskutil(&["info", "-plist", &device])?);
    if properties.is_empty() {
        return Err(DetectError::ParseError(format!(
            "no properties reported for {device}"
        )));
    }
    Ok(properties)
}

pub(crate) fn info_text(disk_id: &str) -> Result<String> {
    diskutil(&["info", &format!("/dev/{disk_id}")])
}
