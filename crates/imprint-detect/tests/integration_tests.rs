//! Integration tests for imprint-detect
//!
//! Parsers are exercised against captured `diskutil` output.

use imprint_detect::*;

const CD_INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Bootable</key>
	<false/>
	<key>BusProtocol</key>
	<string>ATAPI</string>
	<key>DeviceBlockSize</key>
	<integer>2048</integer>
	<key>DeviceIdentifier</key>
	<string>disk4</string>
	<key>DeviceNode</key>
	<string>/dev/disk4</string>
	<key>Ejectable</key>
	<true/>
	<key>FilesystemName</key>
	<string>ISO Rockridge</string>
	<key>FilesystemType</key>
	<string>cd9660</string>
	<key>IORegistryEntryName</key>
	<string>MATSHITA DVD-R UJ-8A8</string>
	<key>Internal</key>
	<false/>
	<key>MediaName</key>
	<string>Family Photos &amp; Video</string>
	<key>MountPoint</key>
	<string>/Volumes/PHOTOS</string>
	<key>OpticalDeviceType</key>
	<string>DVD-RW</string>
	<key>OpticalMediaErasable</key>
	<false/>
	<key>OpticalMediaType</key>
	<string>CD-ROM</string>
	<key>RemovableMedia</key>
	<true/>
	<key>SMARTStatus</key>
	<string>Not Supported</string>
	<key>TotalSize</key>
	<integer>734003200</integer>
	<key>VolumeName</key>
	<string>PHOTOS</string>
	<key>Writable</key>
	<false/>
</dict>
</plist>
"#;

const LIST_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>AllDisks</key>
	<array>
		<string>disk0</string>
		<string>disk0s1</string>
		<string>disk4</string>
	</array>
	<key>WholeDisks</key>
	<array>
		<string>disk0</string>
		<string>disk4</string>
	</array>
</dict>
</plist>
"#;

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_cd_properties() {
    let props = parse_plist_properties(CD_INFO_PLIST);

    assert_eq!(props["TotalSize"], "734003200");
    assert_eq!(props["OpticalMediaType"], "CD-ROM");
    assert_eq!(props["FilesystemType"], "cd9660");
    assert_eq!(props["BusProtocol"], "ATAPI");
    assert_eq!(props["Writable"], "false");
    assert_eq!(props["Ejectable"], "true");
    assert_eq!(props["VolumeName"], "PHOTOS");
    assert_eq!(props["MediaName"], "Family Photos & Video");
    assert_eq!(props.len(), 20);
}

#[test]
fn test_empty_input() {
    assert!(parse_plist_properties("").is_empty());
    assert!(parse_plist_properties("not a plist at all").is_empty());
}

#[test]
fn test_dangling_key_ignored() {
    let props = parse_plist_properties("<key>Orphan</key>\n</dict>\n<key>Size</key>\n<integer>1</integer>");
    assert!(!props.contains_key("Orphan"));
    assert_eq!(props["Size"], "1");
}

// ============================================================================
// Disk list
// ============================================================================

#[test]
fn test_whole_disks() {
    assert_eq!(parse_whole_disks(LIST_PLIST).unwrap(), vec!["disk0", "disk4"]);
}

#[test]
fn test_whole_disks_missing() {
    let err = parse_whole_disks("<plist><dict></dict></plist>").unwrap_err();
    assert!(matches!(err, DetectError::ParseError(_)));
}

#[test]
fn test_disk_entry_json() {
    let entry = DiskEntry {
        identifier: "disk4".to_string(),
        properties: parse_plist_properties(CD_INFO_PLIST),
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.starts_with("{\"identifier\":\"disk4\""));
    assert!(json.contains("\"OpticalMediaType\":\"CD-ROM\""));
}

// ============================================================================
// Mount state
// ============================================================================

#[test]
fn test_mounted_from_info_text() {
    let info = "   Device Identifier:         disk4\n\
                   Volume Name:               PHOTOS\n\
                   Mounted:                   Yes\n\
                   Mount Point:               /Volumes/PHOTOS\n";
    assert!(parse_mounted(info));
    assert!(!parse_mounted(&info.replace("Yes", "No")));
}

#[cfg(not(target_os = "macos"))]
#[test]
fn test_queries_unsupported_off_macos() {
    assert!(matches!(list_disks_text(), Err(DetectError::UnsupportedPlatform)));
    assert!(matches!(disk_properties("disk4"), Err(DetectError::UnsupportedPlatform)));
    assert!(matches!(is_mounted("disk4"), Err(DetectError::UnsupportedPlatform)));
}
