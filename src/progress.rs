//! Spinner shown while waiting on CI checks.

use crate::lifecycle::CheckSummary;
use crate::output::{GREEN, RED, RESET, YELLOW};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use terminal_size::{terminal_size, Width};

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const DEFAULT_TERMINAL_WIDTH: u16 = 80;
// Spinner (2) + "PR #NNNNN | " (12) + " [HH:MM:SS]" (11)
const SPINNER_OVERHEAD: usize = 25;

fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
}

/// Format elapsed time as HH:MM:SS.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Cut `text` to fit the terminal next to the spinner decorations.
fn fit_to_terminal(text: &str, width: usize) -> String {
    let available = width.saturating_sub(SPINNER_OVERHEAD).max(10);
    if text.chars().count() <= available {
        return text.to_string();
    }
    let kept: String = text.chars().take(available.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Single-line spinner updated after every poll.
pub struct CheckSpinner {
    spinner: ProgressBar,
    pr_number: u64,
}

impl CheckSpinner {
    /// A hidden spinner when `quiet` is set, so callers never branch on it.
    pub fn new(pr_number: u64, quiet: bool) -> Self {
        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(SPINNER_CHARS)
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(format!("PR #{} | Waiting for checks... [00:00:00]", pr_number));
        if !quiet {
            spinner.enable_steady_tick(Duration::from_millis(80));
        }
        Self { spinner, pr_number }
    }

    pub fn update(&self, summary: &CheckSummary, elapsed: Duration) {
        let status = fit_to_terminal(&summary.status_line(), terminal_width());
        self.spinner.set_message(format!(
            "PR #{} | {} [{}]",
            self.pr_number,
            status,
            format_elapsed(elapsed)
        ));
    }

    pub fn finish_success(&self, summary: &CheckSummary, elapsed: Duration) {
        self.spinner.finish_and_clear();
        if !self.spinner.is_hidden() {
            println!(
                "{GREEN}✓ Checks finished for PR #{}:{RESET} {} in {}",
                self.pr_number,
                summary.status_line(),
                format_elapsed(elapsed)
            );
        }
    }

    pub fn finish_failure(&self, summary: &CheckSummary, elapsed: Duration) {
        self.spinner.finish_and_clear();
        if !self.spinner.is_hidden() {
            println!(
                "{RED}✗ Checks failed for PR #{}:{RESET} {} after {}",
                self.pr_number,
                summary.status_line(),
                format_elapsed(elapsed)
            );
        }
    }

    pub fn finish_timeout(&self, summary: &CheckSummary, elapsed: Duration) {
        self.spinner.finish_and_clear();
        if !self.spinner.is_hidden() {
            println!(
                "{YELLOW}⏱ Timed out waiting for PR #{}:{RESET} {} after {}",
                self.pr_number,
                summary.status_line(),
                format_elapsed(elapsed)
            );
        }
    }
}

impl Drop for CheckSpinner {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
