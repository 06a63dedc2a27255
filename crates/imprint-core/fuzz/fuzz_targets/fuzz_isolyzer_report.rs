//! Fuzz test for isolyzer report parsing
//!
//! Arbitrary text must either parse into a consistent record or return a
//! parse error, never panic.

#![no_main]

use imprint_core::parse_report;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(analysis) = parse_report(xml) {
        assert!(analysis.performed());
        assert!(analysis.failure.is_none());
        if analysis.tests.is_none() {
            assert!(analysis.warnings.is_empty());
        }
        if analysis.valid_iso9660() {
            assert!(!analysis.filesystems.is_empty());
        }
    }
});
