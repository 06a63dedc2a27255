//! # Imprint Platform
//!
//! Operating system side of an imaging run: the privilege check, device
//! naming, opening the source device for reading, and the external
//! commands that unmount, remount and eject the disc and list its tree.
//!
//! Command lines are built by [`commands`] so the same text can be run
//! here and quoted in the run journal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        mod macos;
        use macos as platform;
    } else {
        mod generic;
        use generic as platform;
    }
}

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device access denied (need elevated privileges)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Device is busy or locked
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to unmount device
    #[error("Unmount failed: {0}")]
    UnmountFailed(String),

    /// External command could not run or failed
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Whether the process runs as root
        pub fn has_elevated_privileges() -> bool {
            unsafe { libc::geteuid() == 0 }
        }
    } else {
        /// Whether the process runs as root (never, off Unix)
        pub fn has_elevated_privileges() -> bool {
            false
        }
    }
}

/// Block device node for a disk identifier
pub fn device_path(disk_id: &str) -> String {
    format!("/dev/{disk_id}")
}

/// Unbuffered device node read during the copy
pub fn raw_device_path(disk_id: &str) -> String {
    platform::raw_device_path(disk_id)
}

// ============================================================================
// Source device
// ============================================================================

/// Source device opened read-only
#[derive(Debug)]
pub struct SourceDevice {
    file: File,
    path: String,
    size: u64,
}

impl SourceDevice {
    /// Path that was opened
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size reported by the device, 0 if it could not be determined
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for SourceDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

/// Open the source device (or image file) for reading
pub fn open_source(path: &str) -> Result<SourceDevice> {
    if !Path::new(path).exists() {
        return Err(PlatformError::DeviceNotFound(path.to_string()));
    }

    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            PlatformError::PermissionDenied(format!(
                "Cannot open {}: {}. Try running with sudo.",
                path, e
            ))
        } else if e.raw_os_error() == Some(16) {
            // EBUSY
            PlatformError::DeviceBusy(format!(
                "{} is busy. Try running: {}",
                path,
                commands::display(&commands::unmount(path))
            ))
        } else {
            PlatformError::Io(e)
        }
    })?;

    let size = match file.metadata() {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => platform::device_size(&file).unwrap_or_else(|| seek_size(&mut file)),
    };
    tracing::debug!("Opened {} ({} bytes)", path, size);

    Ok(SourceDevice {
        file,
        path: path.to_string(),
        size,
    })
}

fn seek_size(file: &mut File) -> u64 {
    let size = file.seek(SeekFrom::End(0)).unwrap_or(0);
    if let Err(e) = file.seek(SeekFrom::Start(0)) {
        tracing::warn!("Could not rewind source after sizing: {}", e);
    }
    size
}

// ============================================================================
// Disk commands
// ============================================================================

fn run(argv: &[String]) -> Result<Output> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PlatformError::CommandFailed("empty command line".to_string()))?;
    tracing::debug!("Running: {}", commands::display(argv));

    Command::new(program).args(args).output().map_err(|e| {
        PlatformError::CommandFailed(format!("Failed to run {}: {}", program, e))
    })
}

fn output_text(output: &Output) -> String {
    format!(
        "{} {}",
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    )
    .trim()
    .to_string()
}

/// Unmount every volume on the disk; an already unmounted disk is not an error
pub fn unmount_disk(device: &str) -> Result<()> {
    let output = run(&commands::unmount(device))?;
    if output.status.success() {
        return Ok(());
    }

    let text = output_text(&output);
    if text.contains("was already unmounted")
        || text.contains("not currently mounted")
        || text.contains("not mounted")
    {
        tracing::debug!("{} already unmounted", device);
        return Ok(());
    }
    Err(PlatformError::UnmountFailed(format!("{device}: {text}")))
}

/// Mount the disk's volume
pub fn mount_disk(device: &str) -> Result<()> {
    let output = run(&commands::mount(device))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PlatformError::CommandFailed(format!(
            "mount {}: {}",
            device,
            output_text(&output)
        )))
    }
}

/// Eject the disc
pub fn eject_disk(device: &str) -> Result<()> {
    let output = run(&commands::eject(device))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PlatformError::CommandFailed(format!(
            "eject {}: {}",
            device,
            output_text(&output)
        )))
    }
}

/// Write the directory tree of `mount_point` to `destination`
pub fn write_tree_listing(mount_point: &Path, destination: &Path) -> Result<()> {
    let argv = commands::tree(mount_point);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PlatformError::CommandFailed("empty command line".to_string()))?;
    tracing::debug!("Running: {}", commands::display(&argv));

    let file = File::create(destination)?;
    let status = Command::new(program)
        .args(args)
        .env("LANG", "en_US.UTF-8")
        .stdout(Stdio::from(file))
        .stderr(Stdio::null())
        .status()
        .map_err(|e| PlatformError::CommandFailed(format!("Failed to run {}: {}", program, e)))?;

    if !status.success() {
        return Err(PlatformError::CommandFailed(format!(
            "{} exited with {}",
            commands::display(&argv),
            status
        )));
    }
    Ok(())
}

// ============================================================================
// UNIT TESTS
// ============================================================================
