//! Section banners.

use terminal_size::{terminal_size, Width};

use super::colors::*;

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const MIN_BANNER_WIDTH: usize = 20;
const MAX_BANNER_WIDTH: usize = 80;

/// Color options for banners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BannerColor {
    Cyan,
    Green,
    Red,
    Yellow,
}

impl BannerColor {
    /// Get the ANSI color code for this banner color.
    pub fn ansi_code(&self) -> &'static str {
        match self {
            BannerColor::Cyan => CYAN,
            BannerColor::Green => GREEN,
            BannerColor::Red => RED,
            BannerColor::Yellow => YELLOW,
        }
    }
}

fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH as usize)
}

fn banner_line(title: &str, width: usize) -> String {
    let title = format!(" {} ", title);
    let remaining = width.saturating_sub(title.chars().count());
    let left = remaining / 2;
    let right = remaining - left;
    format!("{}{}{}", "━".repeat(left), title, "━".repeat(right))
}

/// Print `━━━ TITLE ━━━` across the terminal (clamped to 20..=80 columns).
pub fn print_section_banner(title: &str, color: BannerColor) {
    let width = terminal_width().clamp(MIN_BANNER_WIDTH, MAX_BANNER_WIDTH);
    println!("{}{BOLD}{}{RESET}", color.ansi_code(), banner_line(title, width));
}
