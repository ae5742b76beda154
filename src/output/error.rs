//! Error panel display.

use crate::error::AutoPrError;

use super::colors::*;

const ERROR_PANEL_WIDTH: usize = 60;

/// Structured error information for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    /// Category shown in the panel header (e.g. "Merge Conflict")
    pub error_type: String,
    pub message: String,
    /// Process exit code this error maps to
    pub exit_code: Option<i32>,
    /// Raw stderr from a failed tool, if any
    pub stderr: Option<String>,
    /// Remediation hint
    pub suggestion: Option<String>,
}

impl ErrorDetails {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            exit_code: None,
            stderr: None,
            suggestion: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print this error using the error panel.
    pub fn print_panel(&self) {
        print_error_panel(
            &self.error_type,
            &self.message,
            self.exit_code,
            self.stderr.as_deref(),
            self.suggestion.as_deref(),
        );
    }
}

impl From<&AutoPrError> for ErrorDetails {
    fn from(err: &AutoPrError) -> Self {
        let details = ErrorDetails::new(err.category(), err.to_string()).with_exit_code(err.exit_code());
        match err.suggestion() {
            Some(hint) => details.with_suggestion(hint),
            None => details,
        }
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)?;

        if let Some(code) = self.exit_code {
            write!(f, " [exit code: {}]", code)?;
        }

        if let Some(stderr) = &self.stderr {
            if let Some(first_line) = stderr.trim().lines().next() {
                write!(f, " stderr: {}", first_line)?;
            }
        }

        Ok(())
    }
}

/// Print a dedicated error panel with full error details.
pub fn print_error_panel(
    error_type: &str,
    message: &str,
    exit_code: Option<i32>,
    stderr: Option<&str>,
    suggestion: Option<&str>,
) {
    let top_border = format!("╔{}╗", "═".repeat(ERROR_PANEL_WIDTH - 2));
    let bottom_border = format!("╚{}╝", "═".repeat(ERROR_PANEL_WIDTH - 2));
    let separator = format!("╟{}╢", "─".repeat(ERROR_PANEL_WIDTH - 2));

    eprintln!("{RED}{BOLD}{}{RESET}", top_border);

    let header = format!(" ERROR: {} ", error_type);
    let header_padding = ERROR_PANEL_WIDTH.saturating_sub(header.chars().count() + 2);
    let left_pad = header_padding / 2;
    let right_pad = header_padding - left_pad;
    eprintln!(
        "{RED}{BOLD}║{}{}{}║{RESET}",
        " ".repeat(left_pad),
        header,
        " ".repeat(right_pad)
    );

    eprintln!("{RED}{}{RESET}", separator);

    for line in panel_content("Message", message) {
        print_panel_line(&line);
    }

    if let Some(code) = exit_code {
        print_panel_line(&format!("Exit code: {}", code));
    }

    if let Some(err) = stderr.map(str::trim).filter(|s| !s.is_empty()) {
        eprintln!("{RED}{}{RESET}", separator);
        for line in panel_content("Stderr", err) {
            print_panel_line(&line);
        }
    }

    if let Some(hint) = suggestion {
        eprintln!("{RED}{}{RESET}", separator);
        for line in panel_content("Suggestion", hint) {
            print_panel_line(&line);
        }
    }

    eprintln!("{RED}{BOLD}{}{RESET}", bottom_border);
}

/// Label line plus the content wrapped to fit inside the panel.
fn panel_content(label: &str, content: &str) -> Vec<String> {
    let max_content_width = ERROR_PANEL_WIDTH - 8;
    let mut lines = vec![format!("{}:", label)];

    for line in content.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= max_content_width {
            lines.push(format!("  {}", line));
            continue;
        }
        let mut start = 0;
        while start < chars.len() {
            let end = (start + max_content_width).min(chars.len());
            let break_at = if end == chars.len() {
                end
            } else {
                chars[start..end]
                    .iter()
                    .rposition(|c| c.is_whitespace() || *c == '/' || *c == ':')
                    .map(|i| start + i + 1)
                    .unwrap_or(end)
            };
            let chunk: String = chars[start..break_at].iter().collect();
            lines.push(format!("  {}", chunk.trim_end()));
            start = break_at;
        }
    }
    lines
}

fn print_panel_line(text: &str) {
    let max_width = ERROR_PANEL_WIDTH - 4;
    let display_text: String = text.chars().take(max_width).collect();
    let padding = max_width.saturating_sub(display_text.chars().count());
    eprintln!(
        "{RED}║{RESET} {}{} {RED}║{RESET}",
        display_text,
        " ".repeat(padding)
    );
}
