//! macOS device naming and sizing
//!
//! Raw device nodes (`/dev/rdiskN`) bypass the buffer cache.

use std::fs::File;
use std::os::unix::io::AsRawFd;

pub(crate) fn raw_device_path(disk_id: &str) -> String {
    to_raw_device_path(&format!("/dev/{disk_id}"))
}

/// /dev/disk2 -> /dev/rdisk2
fn to_raw_device_path(path: &str) -> String {
    if path.starts_with("/dev/disk") {
        path.replacen("/dev/disk", "/dev/rdisk", 1)
    } else {
        path.to_string()
    }
}

/// Block count times block size, via ioctl
pub(crate) fn device_size(file: &File) -> Option<u64> {
    // DKIOCGETBLOCKCOUNT / DKIOCGETBLOCKSIZE
    const DKIOCGETBLOCKCOUNT: libc::c_ulong = 0x40086419;
    const DKIOCGETBLOCKSIZE: libc::c_ulong = 0x40046418;

    let fd = file.as_raw_fd();
    let mut block_count: u64 = 0;
    let mut block_size: u32 = 0;

    let count_ok = unsafe { libc::ioctl(fd, DKIOCGETBLOCKCOUNT, &mut block_count) } == 0;
    let size_ok = unsafe { libc::ioctl(fd, DKIOCGETBLOCKSIZE, &mut block_size) } == 0;

    (count_ok && size_ok && block_count > 0 && block_size > 0)
        .then(|| block_count * u64::from(block_size))
}
