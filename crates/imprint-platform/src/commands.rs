//! Command lines for the disk operations
//!
//! Each builder returns the argument vector that is executed; [`display`]
//! renders it for the journal and the log.

use std::path::Path;

#[cfg(target_os = "macos")]
mod programs {
    pub const UNMOUNT: &[&str] = &["diskutil", "unmountDisk"];
    pub const MOUNT: &[&str] = &["diskutil", "mount"];
    pub const EJECT: &[&str] = &["diskutil", "eject"];
}

#[cfg(not(target_os = "macos"))]
mod programs {
    pub const UNMOUNT: &[&str] = &["umount"];
    pub const MOUNT: &[&str] = &["udisksctl", "mount", "-b"];
    pub const EJECT: &[&str] = &["eject"];
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn with_target(program: &[&str], target: &str) -> Vec<String> {
    let mut command = argv(program);
    command.push(target.to_string());
    command
}

/// Unmount every volume of a disk
pub fn unmount(device: &str) -> Vec<String> {
    with_target(programs::UNMOUNT, device)
}

/// Mount a disk's volume
pub fn mount(device: &str) -> Vec<String> {
    with_target(programs::MOUNT, device)
}

/// Eject a disc
pub fn eject(device: &str) -> Vec<String> {
    with_target(programs::EJECT, device)
}

/// Recursive listing with permissions, owners, dates and sizes
pub fn tree(mount_point: &Path) -> Vec<String> {
    with_target(
        &["tree", "-RapugD", "--si", "--du"],
        &mount_point.display().to_string(),
    )
}

/// Render a command line, single-quoting arguments that need it
pub fn display(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
