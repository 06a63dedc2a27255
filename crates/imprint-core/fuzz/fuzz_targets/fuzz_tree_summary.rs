//! Fuzz test for tree listing summary parsing

#![no_main]

use imprint_core::TreeSummary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let listing = String::from_utf8_lossy(data);
    if let Some(summary) = TreeSummary::parse(&listing) {
        if let Some(size) = &summary.reported_size {
            assert!(!size.is_empty());
        }
    }
});
