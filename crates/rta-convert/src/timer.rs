//! Per-step execution timing.

use std::time::Instant;

/// Tracks and reports the wall-clock time of pipeline steps.
///
/// Disabled by default; the `--use-timing` flag enables it. Each step calls
/// [`reset`](UsageTimer::reset) before starting and
/// [`print`](UsageTimer::print) when done.
#[derive(Debug, Default)]
pub struct UsageTimer {
    /// Set to `true` to enable tracking.
    pub enabled: bool,
    start: Option<Instant>,
}

impl UsageTimer {
    /// Creates a disabled timer.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            start: None,
        }
    }

    /// Resets the timer.
    pub fn reset(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Prints the time since the last reset, tagged with the file path and a
    /// step description.
    pub fn print(&self, path: &str, message: &str) {
        if !self.enabled {
            return;
        }

        match self.start {
            Some(start) => {
                let elapsed = start.elapsed();
                eprintln!("Timing: {path}: {message} took {:.1} ms", elapsed.as_secs_f64() * 1000.0);
            }
            None => eprintln!("Timing: {path}: {message} (timer was never reset)"),
        }
    }
}
