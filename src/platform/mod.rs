//! Code-hosting platform access.
//!
//! Workflows only see the [`Platform`] trait. Concrete backends live in
//! [`gh_cli`] (GitHub via the `gh` CLI) and [`github_api`] (GitHub REST with a
//! token); [`registry`] picks one per process from the repository's remote.

pub mod gh_cli;
pub mod github_api;
pub mod registry;
pub mod types;

pub use registry::{detect_platform, parse_repo_slug, PlatformKind, PlatformRegistry, ProviderContext};
pub use types::*;

use crate::error::Result;

/// Operations the workflows need from a code-hosting platform.
///
/// Implementations must map failures onto distinct error kinds: not found,
/// authentication, merge conflict, blocked, and unavailable.
pub trait Platform {
    /// Short backend name for logs and messages.
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn get_pr(&self, number: u64) -> Result<PullRequestFacts>;

    fn create_pr(&self, request: &NewPullRequest) -> Result<PullRequestFacts>;

    fn update_pr(&self, number: u64, update: &PullRequestUpdate) -> Result<PullRequestFacts>;

    /// Returns `false` when the platform refused without a specific error.
    fn merge_pr(&self, number: u64, request: &MergeRequest) -> Result<bool>;

    fn get_checks(&self, number: u64) -> Result<Vec<CheckResult>>;

    fn get_reviews(&self, number: u64) -> Result<Vec<ReviewResult>>;

    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()>;

    fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    fn get_default_branch(&self) -> Result<String>;

    fn list_prs(&self, filter: &ListFilter) -> Result<Vec<PullRequestFacts>>;

    fn get_repo_info(&self) -> Result<RepoInfo>;

    /// First open PR whose head is `branch`.
    fn find_pr_for_branch(&self, branch: &str, base: Option<&str>) -> Result<Option<PullRequestFacts>> {
        let filter = ListFilter {
            state: ListState::Open,
            head: Some(branch.to_string()),
            base: base.map(str::to_string),
            limit: 1,
        };
        Ok(self.list_prs(&filter)?.into_iter().next())
    }
}
