//! Progress computation for the copy view
//!
//! [`ProgressSnapshot`] turns raw transfer state into the values shown in the
//! four-line status view. Rendering lives in the CLI; this module only does
//! the arithmetic, so every field is guaranteed non-negative.

const MIB: f64 = 1024.0 * 1024.0;

/// Derived progress values for one point in a transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Bytes transferred so far
    pub bytes_done: u64,

    /// Declared total size
    pub bytes_total: u64,

    /// Seconds since the transfer started (clamped to >= 0)
    pub elapsed_seconds: f64,

    /// Average throughput in bytes per second
    pub throughput_bps: f64,

    /// Estimated seconds until completion
    pub remaining_seconds: f64,
}

impl ProgressSnapshot {
    /// Compute a snapshot from transfer state
    ///
    /// Negative or NaN elapsed input is treated as zero. Throughput is zero
    /// until time has passed, and the estimate is zero while throughput is.
    pub fn compute(bytes_done: u64, bytes_total: u64, elapsed_seconds: f64) -> Self {
        let elapsed_seconds = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
            elapsed_seconds
        } else {
            0.0
        };

        let throughput_bps = if elapsed_seconds > 0.0 {
            bytes_done as f64 / elapsed_seconds
        } else {
            0.0
        };

        let remaining_bytes = bytes_total.saturating_sub(bytes_done);
        let remaining_seconds = if throughput_bps > 0.0 {
            remaining_bytes as f64 / throughput_bps
        } else {
            0.0
        };

        Self {
            bytes_done,
            bytes_total,
            elapsed_seconds,
            throughput_bps,
            remaining_seconds,
        }
    }

    /// Percentage complete, 100 for an empty transfer
    pub fn percentage(&self) -> f64 {
        if self.bytes_total == 0 {
            return 100.0;
        }
        (self.bytes_done as f64 / self.bytes_total as f64 * 100.0).min(100.0)
    }

    /// Throughput in MiB per second
    pub fn throughput_mb_s(&self) -> f64 {
        self.throughput_bps / MIB
    }

    /// The four status lines: label with current/total, elapsed, remaining, speed
    pub fn lines(&self, label: &str) -> [String; 4] {
        [
            format!(
                "{}: {:.0}MB / {:.0}MB",
                label,
                self.bytes_done as f64 / MIB,
                self.bytes_total as f64 / MIB
            ),
            format!("Elapsed: {}", format_clock(self.elapsed_seconds)),
            format!("Remaining: {}", format_clock(self.remaining_seconds)),
            format!("Avg Speed: {:.2}MB/s", self.throughput_mb_s()),
        ]
    }
}

/// Format seconds as `H:MM:SS`, truncating fractions
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
