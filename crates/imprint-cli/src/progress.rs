//! Console rendering of copy progress
//!
//! On a terminal the four status lines are redrawn in place after every
//! block. Otherwise one plain line is written each time another tenth of
//! the image is done.

use console::Term;
use imprint_core::{CopyProgress, ProgressSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const VIEW_LINES: usize = 4;

#[derive(Debug, Default)]
struct ViewState {
    drawn: bool,
    last_decile: Option<u64>,
}

/// Progress view fed from the copier's callback
pub struct CopyView {
    term: Term,
    label: String,
    interactive: bool,
    silent: bool,
    state: Mutex<ViewState>,
}

impl CopyView {
    /// View on stdout; `silent` suppresses all output
    pub fn new(label: impl Into<String>, silent: bool) -> Self {
        let term = Term::stdout();
        let interactive = term.is_term();
        Self {
            term,
            label: label.into(),
            interactive,
            silent,
            state: Mutex::new(ViewState::default()),
        }
    }

    /// Render one progress update
    pub fn update(&self, progress: &CopyProgress) {
        if self.silent {
            return;
        }
        let snapshot = ProgressSnapshot::compute(
            progress.bytes_done,
            progress.bytes_total,
            progress.elapsed_seconds,
        );
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        let result = if self.interactive {
            self.redraw(&mut state, &snapshot)
        } else {
            match crossed_decile(state.last_decile, snapshot.percentage()) {
                Some(decile) => {
                    state.last_decile = Some(decile);
                    self.term.write_line(&plain_line(&self.label, &snapshot))
                }
                None => Ok(()),
            }
        };
        if let Err(e) = result {
            tracing::debug!("Progress output failed: {}", e);
        }
    }

    fn redraw(&self, state: &mut ViewState, snapshot: &ProgressSnapshot) -> std::io::Result<()> {
        if state.drawn {
            self.term.clear_last_lines(VIEW_LINES)?;
        }
        for line in snapshot.lines(&self.label) {
            self.term.write_line(&line)?;
        }
        state.drawn = true;
        Ok(())
    }
}

/// Next tenth of progress reached, if `percentage` moved past the last one
fn crossed_decile(last: Option<u64>, percentage: f64) -> Option<u64> {
    let decile = (percentage.clamp(0.0, 100.0) / 10.0).floor() as u64;
    match last {
        Some(previous) if decile <= previous => None,
        _ => Some(decile),
    }
}

/// Single-line form of a snapshot for logs and pipes
fn plain_line(label: &str, snapshot: &ProgressSnapshot) -> String {
    let [amounts, elapsed, remaining, speed] = snapshot.lines(label);
    format!(
        "{} ({:.0}%) | {} | {} | {}",
        amounts,
        snapshot.percentage(),
        elapsed,
        remaining,
        speed
    )
}

/// Spinner shown while an external step runs
pub fn spinner(message: &str, silent: bool) -> ProgressBar {
    if silent {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    match ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
        Ok(style) => pb.set_style(style),
        Err(e) => tracing::debug!("Spinner template rejected: {}", e),
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossed_decile_first_update() {
        assert_eq!(crossed_decile(None, 0.0), Some(0));
        assert_eq!(crossed_decile(None, 37.5), Some(3));
    }

    #[test]
    fn test_crossed_decile_only_advances() {
        assert_eq!(crossed_decile(Some(3), 39.9), None);
        assert_eq!(crossed_decile(Some(3), 40.0), Some(4));
        assert_eq!(crossed_decile(Some(9), 100.0), Some(10));
        assert_eq!(crossed_decile(Some(10), 100.0), None);
    }

    #[test]
    fn test_crossed_decile_clamps_input() {
        assert_eq!(crossed_decile(None, -5.0), Some(0));
        assert_eq!(crossed_decile(None, 250.0), Some(10));
    }

    #[test]
    fn test_plain_line() {
        let snapshot = ProgressSnapshot::compute(50 * 1024 * 1024, 100 * 1024 * 1024, 10.0);
        let line = plain_line("Imaging", &snapshot);
        assert_eq!(
            line,
            "Imaging: 50MB / 100MB (50%) | Elapsed: 0:00:10 | Remaining: 0:00:10 | Avg Speed: 5.00MB/s"
        );
    }

    #[test]
    fn test_silent_view_ignores_updates() {
        let view = CopyView::new("Imaging", true);
        view.update(&CopyProgress {
            bytes_done: 1,
            bytes_total: 2,
            elapsed_seconds: 1.0,
        });
        let state = view.state.lock().unwrap();
        assert!(!state.drawn);
        assert!(state.last_decile.is_none());
    }

    #[test]
    fn test_spinner_hidden_when_silent() {
        let pb = spinner("Analyzing", true);
        assert!(pb.is_hidden());
        pb.finish_and_clear();
    }
}
