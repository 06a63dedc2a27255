//! Fuzz test for the `diskutil info` mount state parser

#![no_main]

use imprint_detect::parse_mounted;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let mounted = parse_mounted(data);
    if mounted {
        assert!(data.contains("Mounted:"));
    }
});
