//! Terminal output formatting for auto-pr.
//!
//! Functions are organized by domain:
//!
//! - [`banner`] - section banners sized to the terminal
//! - [`messages`] - error, warning, info and step messages
//! - [`pr`] - PR creation, update and merge output
//! - [`status`] - lifecycle status, check and review tables, conflict guidance
//! - [`error`] - error panels with remediation hints

pub mod banner;
pub mod error;
pub mod messages;
pub mod pr;
pub mod status;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

// Re-export colors at module level for convenience
pub use colors::*;

pub use banner::{print_section_banner, BannerColor};
pub use error::{print_error_panel, ErrorDetails};
pub use messages::{print_info, print_step, print_success, print_warning};
pub use pr::{
    print_already_merged, print_branch_created, print_generated_text, print_merge_message,
    print_pr_already_exists, print_pr_created, print_pr_merged, print_pr_updated, print_prompt,
    print_push_success,
};
pub use status::{
    print_blocking_reasons, print_check_summary, print_checks_table, print_conflict_guidance,
    print_pr_status, print_reviews_table, state_color,
};
