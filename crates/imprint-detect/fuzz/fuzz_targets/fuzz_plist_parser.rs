//! Fuzz test for diskutil plist parsing
//!
//! Both plist parsers must accept arbitrary text without panicking.

#![no_main]

use imprint_detect::{parse_plist_properties, parse_whole_disks};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let properties = parse_plist_properties(data);
    for key in properties.keys() {
        assert!(!key.contains('\n'));
    }

    if let Ok(disks) = parse_whole_disks(data) {
        assert!(!disks.is_empty());
    }
});
