//! Device naming and sizing where no raw device nodes exist

use std::fs::File;

pub(crate) fn raw_device_path(disk_id: &str) -> String {
    format!("/dev/{disk_id}")
}

/// No ioctl sizing; callers fall back to seeking
pub(crate) fn device_size(_file: &File) -> Option<u64> {
    None
}
