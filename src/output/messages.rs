//! Basic message output functions.

use super::colors::*;

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

/// Print a workflow step, e.g. "→ Fetching PR #12".
pub fn print_step(msg: &str) {
    println!("{CYAN}→{RESET} {}", msg);
}

pub fn print_success(msg: &str) {
    println!("{GREEN}✓{RESET} {}", msg);
}
