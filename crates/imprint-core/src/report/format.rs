//! Human-readable formatting shared by the log and the manifest

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Format a byte count with 1024-based units and one decimal
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < KIB {
            return format!("{value:.1} {unit}");
        }
        value /= KIB;
    }
    format!("{value:.1} TB")
}

/// Split seconds into whole minutes and the remaining seconds
///
/// Hours are not split out: 3661 seconds is 61 minutes and 1 second.
pub fn split_duration(seconds: f64) -> (u64, f64) {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let minutes = (seconds as u64) / 60;
    (minutes, seconds - (minutes * 60) as f64)
}

/// Format a duration for the manifest and console summary
///
/// `0 seconds` for zero, `S.SS seconds` below a minute, otherwise
/// `M minutes, S.SS seconds`.
pub fn format_duration(seconds: f64) -> String {
    let (minutes, rest) = split_duration(seconds);
    if minutes == 0 && rest == 0.0 {
        return "0 seconds".to_string();
    }
    if minutes > 0 {
        format!("{minutes} minutes, {rest:.2} seconds")
    } else {
        format!("{rest:.2} seconds")
    }
}

/// Compact duration for the human log (`Mm S.SSs`)
pub fn format_duration_short(seconds: f64) -> String {
    let (minutes, rest) = split_duration(seconds);
    format!("{minutes}m {rest:.2}s")
}

/// Average speed in MiB/s, rounded to two decimals; zero for zero duration
pub fn speed_mb_s(bytes: u64, seconds: f64) -> f64 {
    if !(seconds.is_finite() && seconds > 0.0) {
        return 0.0;
    }
    let speed = ((bytes as f64 / seconds / MIB) * 100.0).round() / 100.0;
    if speed.is_finite() { speed } else { 0.0 }
}
