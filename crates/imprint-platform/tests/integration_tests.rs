//! Integration tests for imprint-platform
//!
//! Only behavior that does not need a real optical drive is exercised here.

use imprint_platform::*;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, tempdir};

#[test]
fn test_commands_end_with_device() {
    for argv in [
        commands::unmount("/dev/disk4"),
        commands::mount("/dev/disk4"),
        commands::eject("/dev/disk4"),
    ] {
        assert!(argv.len() >= 2);
        assert_eq!(argv.last().map(String::as_str), Some("/dev/disk4"));
    }
}

#[test]
fn test_tree_command_display() {
    let argv = commands::tree(Path::new("/Volumes/FAMILY PHOTOS"));
    assert_eq!(
        commands::display(&argv),
        "tree -RapugD --si --du '/Volumes/FAMILY PHOTOS'"
    );
}

#[cfg(target_os = "macos")]
#[test]
fn test_macos_commands() {
    assert_eq!(
        commands::display(&commands::unmount("/dev/disk4")),
        "diskutil unmountDisk /dev/disk4"
    );
    assert_eq!(
        commands::display(&commands::eject("/dev/disk4")),
        "diskutil eject /dev/disk4"
    );
    assert_eq!(raw_device_path("disk4"), "/dev/rdisk4");
}

#[test]
fn test_open_source_reads_everything() {
    let mut temp = NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    temp.write_all(&data).unwrap();
    temp.flush().unwrap();

    let mut source = open_source(temp.path().to_str().unwrap()).unwrap();
    assert_eq!(source.size(), data.len() as u64);

    let mut read_back = Vec::new();
    source.read_to_end(&mut read_back).unwrap();
    assert_eq!(read_back, data);
}

#[test]
fn test_open_source_missing() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("disk99");
    let err = open_source(missing.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, PlatformError::DeviceNotFound(_)));
    assert!(err.to_string().contains("disk99"));
}

#[test]
fn test_tree_listing_missing_mount_point() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("tree.txt");
    let result = write_tree_listing(&dir.path().join("not-mounted"), &destination);

    // GNU tree exits 0 on a missing directory, so only the error shape is checked
    if let Err(e) = result {
        assert!(matches!(e, PlatformError::CommandFailed(_)));
    }
}

#[test]
fn test_tree_listing_unwritable_destination() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("no-such-dir").join("tree.txt");
    let err = write_tree_listing(dir.path(), &destination).unwrap_err();
    assert!(matches!(err, PlatformError::Io(_)));
}
