//! Source disk metadata
//!
//! Wraps the flat key/value properties reported by the disk utility and
//! exposes the handful the report needs, with `"Unknown"` for anything
//! missing.

use crate::config::UNKNOWN;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields shown in the "detailed disk metadata" section of the log
pub const DISPLAY_FIELDS: &[(&str, &str)] = &[
    ("Device Identifier", "DeviceIdentifier"),
    ("Drive Model", "MediaName"),
    ("Drive Capabilities", "OpticalDeviceType"),
    ("Connection", "BusProtocol"),
    ("Physical Size", "TotalSize"),
    ("Volume Capacity", "VolumeSize"),
    ("Media Type", "OpticalMediaType"),
    ("File System", "FilesystemName"),
    ("Writable", "Writable"),
    ("Erasable", "OpticalMediaErasable"),
];

/// Properties of the source disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetadata {
    properties: BTreeMap<String, String>,
}

impl DiskMetadata {
    /// Build from key/value pairs
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Whether nothing is known about the disk
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Raw property lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    fn text_or_unknown(&self, keys: &[&str]) -> String {
        self.first_of(keys).unwrap_or(UNKNOWN).to_string()
    }

    fn number(&self, keys: &[&str]) -> Option<u64> {
        self.first_of(keys).and_then(|v| v.parse().ok())
    }

    /// Parse a boolean property
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "true" | "Yes" | "yes" | "1" => Some(true),
            "false" | "No" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Total size of the medium in bytes, 0 when unknown
    pub fn total_size(&self) -> u64 {
        self.number(&["TotalSize", "Size"]).unwrap_or(0)
    }

    /// Used space of the volume, falling back to the total size
    pub fn volume_size(&self) -> u64 {
        self.number(&["VolumeSize"]).unwrap_or_else(|| self.total_size())
    }

    /// Allocation block size in bytes
    pub fn allocation_block_size(&self) -> Option<u64> {
        self.number(&["VolumeAllocationBlockSize", "DeviceBlockSize"])
    }

    /// Optical media type (e.g. `CD-ROM`, `DVD-R`)
    pub fn media_type(&self) -> String {
        self.text_or_unknown(&["OpticalMediaType"])
    }

    /// Filesystem name or type
    pub fn filesystem(&self) -> String {
        self.text_or_unknown(&["FilesystemName", "FilesystemType"])
    }

    /// Drive or media model name
    pub fn drive_model(&self) -> String {
        self.text_or_unknown(&["MediaName", "IORegistryEntryName"])
    }

    /// Optical drive capabilities
    pub fn drive_capabilities(&self) -> String {
        self.text_or_unknown(&["OpticalDeviceType"])
    }

    /// Bus protocol
    pub fn connection_type(&self) -> String {
        self.text_or_unknown(&["BusProtocol"])
    }

    /// Media is erasable (defaults to false)
    pub fn erasable(&self) -> bool {
        self.flag("OpticalMediaErasable").unwrap_or(false)
    }

    /// Media is read-only (defaults to false)
    pub fn read_only(&self) -> bool {
        !self.flag("Writable").unwrap_or(true)
    }

    /// Current mount point, if mounted
    pub fn mount_point(&self) -> Option<&str> {
        self.get("MountPoint")
    }

    /// Volume name
    pub fn volume_name(&self) -> Option<&str> {
        self.get("VolumeName")
    }

    /// Labelled values for the log, in display order, skipping absent keys
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        DISPLAY_FIELDS
            .iter()
            .filter_map(|(label, key)| self.get(key).map(|v| (*label, v.to_string())))
            .collect()
    }

    /// Iterate every property in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd() -> DiskMetadata {
        DiskMetadata::from_properties([
            ("TotalSize", "734003200"),
            ("VolumeSize", "650002432"),
            ("OpticalMediaType", "CD-ROM"),
            ("FilesystemType", "cd9660"),
            ("IORegistryEntryName", "MATSHITA DVD-R UJ-8A8"),
            ("BusProtocol", "ATAPI"),
            ("OpticalMediaErasable", "false"),
            ("Writable", "false"),
            ("DeviceBlockSize", "2048"),
            ("MountPoint", "/Volumes/PHOTOS"),
            ("VolumeName", "PHOTOS"),
        ])
    }

    #[test]
    fn test_accessors() {
        let disk = cd();
        assert_eq!(disk.total_size(), 734_003_200);
        assert_eq!(disk.volume_size(), 650_002_432);
        assert_eq!(disk.allocation_block_size(), Some(2048));
        assert_eq!(disk.media_type(), "CD-ROM");
        assert_eq!(disk.filesystem(), "cd9660");
        assert_eq!(disk.drive_model(), "MATSHITA DVD-R UJ-8A8");
        assert_eq!(disk.connection_type(), "ATAPI");
        assert!(!disk.erasable());
        assert!(disk.read_only());
        assert_eq!(disk.mount_point(), Some("/Volumes/PHOTOS"));
        assert_eq!(disk.volume_name(), Some("PHOTOS"));
    }

    #[test]
    fn test_missing_values_are_unknown() {
        let disk = DiskMetadata::default();
        assert!(disk.is_empty());
        assert_eq!(disk.total_size(), 0);
        assert_eq!(disk.media_type(), "Unknown");
        assert_eq!(disk.filesystem(), "Unknown");
        assert_eq!(disk.drive_capabilities(), "Unknown");
        assert!(!disk.read_only());
        assert_eq!(disk.allocation_block_size(), None);
        assert_eq!(disk.mount_point(), None);
    }

    #[test]
    fn test_volume_size_falls_back_to_total() {
        let disk = DiskMetadata::from_properties([("TotalSize", "100")]);
        assert_eq!(disk.volume_size(), 100);
    }

    #[test]
    fn test_empty_values_ignored() {
        let disk = DiskMetadata::from_properties([("FilesystemName", ""), ("FilesystemType", "udf")]);
        assert_eq!(disk.filesystem(), "udf");
    }

    #[test]
    fn test_display_rows_order() {
        let rows = cd().display_rows();
        let labels: Vec<_> = rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(
            labels,
            vec![
                "Connection",
                "Physical Size",
                "Volume Capacity",
                "Media Type",
                "Writable",
                "Erasable"
            ]
        );
    }
}
