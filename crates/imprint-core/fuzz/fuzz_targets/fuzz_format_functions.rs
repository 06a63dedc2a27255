//! Fuzz test for report formatting helpers
//!
//! Byte, duration and speed formatting must accept any input, including
//! NaN, infinities and negative durations.

#![no_main]

use arbitrary::Arbitrary;
use imprint_core::ProgressSnapshot;
use imprint_core::report::{format_bytes, format_duration, format_duration_short, speed_mb_s};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FormatInput {
    bytes: u64,
    total: u64,
    seconds: f64,
}

fuzz_target!(|input: FormatInput| {
    let size = format_bytes(input.bytes);
    assert!(size.ends_with('B'), "Missing unit: {}", size);

    let duration = format_duration(input.seconds);
    assert!(duration.ends_with("seconds"), "Missing unit: {}", duration);

    let short = format_duration_short(input.seconds);
    assert!(short.contains('m') && short.ends_with('s'));

    let speed = speed_mb_s(input.bytes, input.seconds);
    assert!(speed.is_finite() && speed >= 0.0);

    let snapshot = ProgressSnapshot::compute(input.bytes, input.total, input.seconds);
    let pct = snapshot.percentage();
    assert!((0.0..=100.0).contains(&pct), "Percentage out of range: {}", pct);
    for line in snapshot.lines("Progress") {
        assert!(!line.is_empty());
    }
});
