use std::io::Write;

use crate::core::aggregator::ProgressReporter;
use crate::core::formatter::{format_percent, format_progress_bar};

const BAR_WIDTH: usize = 24;

/// Redraws a single progress line on stderr.
pub struct TerminalProgress {
    label: String,
    drawn: bool,
}

impl TerminalProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            drawn: false,
        }
    }

    pub fn line(&self, fraction: f64) -> String {
        format!(
            " Processing {} {} {}",
            self.label,
            format_progress_bar(fraction, BAR_WIDTH),
            format_percent(fraction)
        )
    }

    /// Clear the progress line so following output starts clean.
    pub fn finish(&mut self) {
        if self.drawn {
            eprint!("\r\x1b[2K");
            let _ = std::io::stderr().flush();
            self.drawn = false;
        }
    }
}

impl ProgressReporter for TerminalProgress {
    fn report(&mut self, fraction: f64) {
        eprint!("\r{}", self.line(fraction));
        let _ = std::io::stderr().flush();
        self.drawn = true;
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_shows_label_bar_and_percent() {
        let progress = TerminalProgress::new("2023-07");
        let line = progress.line(0.5);
        assert!(line.contains("2023-07"));
        assert!(line.contains("50%"));
        assert!(line.contains('█'));
    }

    #[test]
    fn finish_without_draw_is_noop() {
        let mut progress = TerminalProgress::new("2023-07");
        progress.finish();
        assert!(!progress.drawn);
    }
}
