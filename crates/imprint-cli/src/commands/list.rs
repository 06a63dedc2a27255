//! List command - shows attached disks

use anyhow::{Context, Result};
use console::style;
use imprint_core::DiskMetadata;
use imprint_core::report::format_bytes;
use imprint_detect::DiskEntry;

/// Execute the list command
pub fn execute(json: bool, silent: bool) -> Result<()> {
    // JSON output is machine-readable, so it is printed even in silent mode
    if json {
        let disks = imprint_detect::list_disks().context("Failed to list disks")?;
        println!("{}", disks_json(&disks)?);
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    let listing = imprint_detect::list_disks_text().context("Failed to list disks")?;
    println!("{}", style("Attached disks").bold());
    println!();
    println!("{}", listing.trim_end());
    println!();
    println!(
        "{}",
        style("Pass the identifier of the optical disc to 'imprint backup --disk'.").dim()
    );
    Ok(())
}

/// One line summary of a disk, used by the backup prompt
pub fn describe(disk: &DiskMetadata) -> String {
    let name = disk.volume_name().unwrap_or("(no volume)");
    format!(
        "{} | {} | {} | {}",
        name,
        disk.media_type(),
        disk.filesystem(),
        format_bytes(disk.total_size())
    )
}

fn disks_json(disks: &[DiskEntry]) -> Result<String> {
    serde_json::to_string_pretty(disks).context("Failed to serialize disk list")
}
