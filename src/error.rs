use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::llm::LlmError;

/// Exit code for generic failures (config, io, git, LLM, user abort).
pub const EXIT_GENERIC: i32 = 1;
/// Exit code for platform access failures (not found, auth, unavailable).
pub const EXIT_PLATFORM: i32 = 7;
/// Exit code for merge conflicts.
pub const EXIT_MERGE_CONFLICT: i32 = 8;
/// Exit code for failed, pending or endlessly retried checks.
pub const EXIT_CHECKS: i32 = 9;
/// Exit code for PRs blocked by policy or review state.
pub const EXIT_BLOCKED: i32 = 10;
/// Exit code for internal state machine misuse.
pub const EXIT_SOFTWARE: i32 = 70;

/// Number of items shown when an error lists checks or files.
const MAX_LISTED: usize = 10;

#[derive(Error, Debug)]
pub enum AutoPrError {
    #[error("Pull request #{0} not found")]
    PrNotFound(u64),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Authentication failed for {platform}: {message}")]
    Authentication { platform: String, message: String },

    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Merge conflict in PR #{pr_number}{}", list_suffix(.files))]
    MergeConflict { pr_number: u64, files: Vec<String> },

    #[error("Checks failed for PR #{pr_number}{}", list_suffix(.checks))]
    ChecksFailed { pr_number: u64, checks: Vec<String> },

    #[error("Checks still pending for PR #{pr_number}{}", list_suffix(.checks))]
    ChecksPending { pr_number: u64, checks: Vec<String> },

    #[error("Gave up on PR #{pr_number} after {attempts} retry attempt(s)")]
    RetryLimitExceeded { pr_number: u64, attempts: u32 },

    #[error("PR #{pr_number} is blocked: {}", .reasons.join("; "))]
    PrBlocked { pr_number: u64, reasons: Vec<String> },

    #[error("{}", review_message(.required, .approved, .changes_requested_by))]
    ReviewRequired {
        required: u32,
        approved: u32,
        changes_requested_by: Vec<String>,
    },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Git error: {0}")]
    Git(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AutoPrError {
    /// Stable process exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            AutoPrError::PrNotFound(_)
            | AutoPrError::BranchNotFound(_)
            | AutoPrError::Authentication { .. }
            | AutoPrError::PlatformUnavailable(_)
            | AutoPrError::Platform(_)
            | AutoPrError::Http(_) => EXIT_PLATFORM,
            AutoPrError::MergeConflict { .. } => EXIT_MERGE_CONFLICT,
            AutoPrError::ChecksFailed { .. }
            | AutoPrError::ChecksPending { .. }
            | AutoPrError::RetryLimitExceeded { .. } => EXIT_CHECKS,
            AutoPrError::PrBlocked { .. } | AutoPrError::ReviewRequired { .. } => EXIT_BLOCKED,
            AutoPrError::InvalidTransition(_) => EXIT_SOFTWARE,
            AutoPrError::Git(_)
            | AutoPrError::Llm(_)
            | AutoPrError::Config(_)
            | AutoPrError::Aborted(_)
            | AutoPrError::Io(_)
            | AutoPrError::Json(_) => EXIT_GENERIC,
        }
    }

    /// Remediation hint shown under the error, if there is one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AutoPrError::Authentication { .. } => {
                Some("Run 'gh auth login' or set the GITHUB_TOKEN environment variable")
            }
            AutoPrError::PlatformUnavailable(_) => {
                Some("Install the GitHub CLI (https://cli.github.com) or set GITHUB_TOKEN")
            }
            AutoPrError::MergeConflict { .. } => {
                Some("Resolve conflicts by rebasing or merging the base branch, or pass --auto-resolve")
            }
            AutoPrError::ChecksFailed { .. } => {
                Some("Fix the failing checks or use --ignore-checks to proceed")
            }
            AutoPrError::ChecksPending { .. } => {
                Some("Wait for checks to complete, raise --timeout, or use --ignore-checks")
            }
            AutoPrError::RetryLimitExceeded { .. } => {
                Some("Checks keep failing after retries; inspect the CI logs before retrying again")
            }
            AutoPrError::ReviewRequired { .. } => {
                Some("Address review feedback or obtain the required approvals")
            }
            AutoPrError::InvalidTransition(_) => {
                Some("This is a bug in auto-pr; please report it with --debug output")
            }
            AutoPrError::Llm(LlmError::Authentication { .. }) => {
                Some("Check the API key for the configured model provider")
            }
            _ => None,
        }
    }

    /// Short category label for the error panel header.
    pub fn category(&self) -> &'static str {
        match self.exit_code() {
            EXIT_PLATFORM => "Platform Error",
            EXIT_MERGE_CONFLICT => "Merge Conflict",
            EXIT_CHECKS => "Checks",
            EXIT_BLOCKED => "PR Blocked",
            EXIT_SOFTWARE => "Internal Error",
            _ => "Error",
        }
    }
}

fn list_suffix(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let shown: Vec<&str> = items.iter().take(MAX_LISTED).map(String::as_str).collect();
    let more = items.len().saturating_sub(MAX_LISTED);
    if more > 0 {
        format!(": {} (+{} more)", shown.join(", "), more)
    } else {
        format!(": {}", shown.join(", "))
    }
}

fn review_message(required: &u32, approved: &u32, changes_requested_by: &[String]) -> String {
    if !changes_requested_by.is_empty() {
        format!("Changes requested by: {}", changes_requested_by.join(", "))
    } else {
        format!(
            "Need {} more approval(s) ({}/{})",
            required.saturating_sub(*approved),
            approved,
            required
        )
    }
}

pub type Result<T> = std::result::Result<T, AutoPrError>;
