//! Pull request data model shared by every platform backend.
//!
//! Everything here is a snapshot: backends build fresh values on every query
//! and nothing is cached between workflow steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum number of check names listed in a blocking reason.
const MAX_REASON_NAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
    Draft,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Closed => "closed",
            PrState::Merged => "merged",
            PrState::Draft => "draft",
        }
    }

    /// Parse a platform state string (`OPEN`, `closed`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Some(PrState::Open),
            "closed" => Some(PrState::Closed),
            "merged" => Some(PrState::Merged),
            "draft" => Some(PrState::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Queued => "queued",
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "queued" | "requested" | "waiting" | "pending" | "expected" => {
                Some(CheckStatus::Queued)
            }
            "in_progress" => Some(CheckStatus::InProgress),
            "completed" => Some(CheckStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Pending,
}

impl CheckConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Neutral => "neutral",
            CheckConclusion::Cancelled => "cancelled",
            CheckConclusion::Skipped => "skipped",
            CheckConclusion::TimedOut => "timed_out",
            CheckConclusion::ActionRequired => "action_required",
            CheckConclusion::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Some(CheckConclusion::Success),
            "failure" | "error" | "startup_failure" => Some(CheckConclusion::Failure),
            "neutral" => Some(CheckConclusion::Neutral),
            "cancelled" => Some(CheckConclusion::Cancelled),
            "skipped" => Some(CheckConclusion::Skipped),
            "timed_out" => Some(CheckConclusion::TimedOut),
            "action_required" => Some(CheckConclusion::ActionRequired),
            "pending" => Some(CheckConclusion::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Pending,
    Dismissed,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Approved => "approved",
            ReviewState::ChangesRequested => "changes requested",
            ReviewState::Commented => "commented",
            ReviewState::Pending => "pending",
            ReviewState::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "APPROVED" => Some(ReviewState::Approved),
            "CHANGES_REQUESTED" => Some(ReviewState::ChangesRequested),
            "COMMENTED" => Some(ReviewState::Commented),
            "PENDING" => Some(ReviewState::Pending),
            "DISMISSED" => Some(ReviewState::Dismissed),
            _ => None,
        }
    }
}

/// Composite mergeability signal reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    Mergeable,
    Conflicting,
    Unknown,
    Blocked,
    Behind,
    Unstable,
    Clean,
    Dirty,
    HasHooks,
}

impl MergeableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeableState::Mergeable => "mergeable",
            MergeableState::Conflicting => "conflicting",
            MergeableState::Unknown => "unknown",
            MergeableState::Blocked => "blocked",
            MergeableState::Behind => "behind",
            MergeableState::Unstable => "unstable",
            MergeableState::Clean => "clean",
            MergeableState::Dirty => "dirty",
            MergeableState::HasHooks => "has_hooks",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mergeable" => Some(MergeableState::Mergeable),
            "conflicting" => Some(MergeableState::Conflicting),
            "unknown" => Some(MergeableState::Unknown),
            "blocked" => Some(MergeableState::Blocked),
            "behind" => Some(MergeableState::Behind),
            "unstable" => Some(MergeableState::Unstable),
            "clean" => Some(MergeableState::Clean),
            "dirty" => Some(MergeableState::Dirty),
            "has_hooks" => Some(MergeableState::HasHooks),
            _ => None,
        }
    }

    pub fn is_conflicting(&self) -> bool {
        matches!(self, MergeableState::Conflicting | MergeableState::Dirty)
    }
}

/// A single CI check run or commit status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CheckResult {
    pub fn new(
        name: impl Into<String>,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            conclusion,
            url: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn completed(name: impl Into<String>, conclusion: CheckConclusion) -> Self {
        Self::new(name, CheckStatus::Completed, Some(conclusion))
    }

    pub fn running(name: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::InProgress, None)
    }

    pub fn is_pending(&self) -> bool {
        self.status != CheckStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self.conclusion,
            Some(CheckConclusion::Failure | CheckConclusion::TimedOut | CheckConclusion::Cancelled)
        )
    }

    pub fn is_successful(&self) -> bool {
        self.conclusion == Some(CheckConclusion::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self.conclusion,
            Some(CheckConclusion::Skipped | CheckConclusion::Neutral)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub user: String,
    pub state: ReviewState,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ReviewResult {
    pub fn new(user: impl Into<String>, state: ReviewState) -> Self {
        Self {
            user: user.into(),
            state,
            submitted_at: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.state == ReviewState::Approved
    }

    pub fn requests_changes(&self) -> bool {
        self.state == ReviewState::ChangesRequested
    }
}

/// Keep only each reviewer's latest verdict.
///
/// Platforms return every review ever submitted, so a reviewer who requested
/// changes and later approved shows up twice. A later comment does not replace
/// an earlier approval or change request. Order of first appearance is kept.
pub fn latest_reviews(reviews: Vec<ReviewResult>) -> Vec<ReviewResult> {
    let mut latest: Vec<ReviewResult> = Vec::new();
    for review in reviews {
        match latest.iter_mut().find(|r| r.user == review.user) {
            Some(existing) => {
                let keeps_verdict = review.state == ReviewState::Commented
                    && matches!(
                        existing.state,
                        ReviewState::Approved | ReviewState::ChangesRequested
                    );
                if !keeps_verdict {
                    *existing = review;
                }
            }
            None => latest.push(review),
        }
    }
    latest
}

/// Snapshot of everything observable about one pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestFacts {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: PrState,
    pub is_draft: bool,
    pub base_branch: String,
    pub head_branch: String,
    pub url: String,
    pub author: Option<String>,
    /// `None` means the platform has not computed mergeability yet.
    pub mergeable: Option<bool>,
    pub mergeable_state: Option<MergeableState>,
    pub checks: Vec<CheckResult>,
    pub reviews: Vec<ReviewResult>,
    pub labels: BTreeSet<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PullRequestFacts {
    /// A minimal open PR, mostly useful as a base for struct update syntax.
    pub fn open(number: u64, head_branch: impl Into<String>, base_branch: impl Into<String>) -> Self {
        Self {
            number,
            title: String::new(),
            body: String::new(),
            state: PrState::Open,
            is_draft: false,
            base_branch: base_branch.into(),
            head_branch: head_branch.into(),
            url: String::new(),
            author: None,
            mergeable: None,
            mergeable_state: None,
            checks: Vec::new(),
            reviews: Vec::new(),
            labels: BTreeSet::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Open PRs include drafts reported as a distinct state.
    pub fn is_open(&self) -> bool {
        matches!(self.state, PrState::Open | PrState::Draft)
    }

    pub fn is_merged(&self) -> bool {
        self.state == PrState::Merged
    }

    pub fn is_draft(&self) -> bool {
        self.is_draft || self.state == PrState::Draft
    }

    pub fn has_conflicts(&self) -> bool {
        self.mergeable_state
            .map(|s| s.is_conflicting())
            .unwrap_or(false)
    }

    /// Vacuously true without checks; otherwise every completed check succeeded.
    /// Skipped and neutral conclusions do not count as success.
    pub fn checks_passed(&self) -> bool {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Completed)
            .all(CheckResult::is_successful)
    }

    pub fn checks_pending(&self) -> bool {
        self.checks.iter().any(CheckResult::is_pending)
    }

    pub fn checks_failed(&self) -> bool {
        self.checks.iter().any(CheckResult::is_failed)
    }

    pub fn is_approved(&self) -> bool {
        !self.reviews.is_empty()
            && self.reviews.iter().any(ReviewResult::is_approved)
            && !self.reviews.iter().any(ReviewResult::requests_changes)
    }

    pub fn pending_reviewers(&self) -> Vec<String> {
        self.reviews
            .iter()
            .filter(|r| r.state == ReviewState::Pending)
            .map(|r| r.user.clone())
            .collect()
    }

    pub fn changes_requested_by(&self) -> Vec<String> {
        self.reviews
            .iter()
            .filter(|r| r.requests_changes())
            .map(|r| r.user.clone())
            .collect()
    }

    pub fn pending_check_names(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| c.is_pending())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn failed_check_names(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| c.is_failed())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn can_merge(&self) -> bool {
        self.is_open()
            && !self.is_draft()
            && self.mergeable != Some(false)
            && !self.has_conflicts()
            && self.checks_passed()
            && !self.checks_pending()
    }

    /// Human-readable reasons the PR cannot be merged right now.
    pub fn blocking_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();

        if !self.is_open() {
            reasons.push(format!("PR is {}", self.state));
        }
        if self.is_draft() {
            reasons.push("PR is a draft".to_string());
        }
        if self.has_conflicts() {
            reasons.push("PR has merge conflicts".to_string());
        }
        let pending = self.pending_check_names();
        if !pending.is_empty() {
            reasons.push(format!(
                "Checks pending: {}",
                first_names(&pending).join(", ")
            ));
        }
        let failed = self.failed_check_names();
        if !failed.is_empty() {
            reasons.push(format!("Checks failed: {}", first_names(&failed).join(", ")));
        }
        let requesters = self.changes_requested_by();
        if !requesters.is_empty() {
            reasons.push(format!("Changes requested by: {}", requesters.join(", ")));
        }

        reasons
    }
}

fn first_names(names: &[String]) -> &[String] {
    &names[..names.len().min(MAX_REASON_NAMES)]
}

/// Owner, name and URL of the hosting repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl std::str::FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(format!(
                "unknown merge method '{}' (expected merge, squash or rebase)",
                other
            )),
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for opening a new pull request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
    pub reviewers: Vec<String>,
    pub labels: Vec<String>,
}

/// Fields to change on an existing pull request. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullRequestUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<PrState>,
    pub draft: Option<bool>,
}

impl PullRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.state.is_none() && self.draft.is_none()
    }
}

/// Parameters for merging a pull request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeRequest {
    pub method: MergeMethod,
    pub commit_title: Option<String>,
    pub commit_message: Option<String>,
    pub delete_branch: bool,
}

/// Which pull requests `list_prs` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListState {
    #[default]
    Open,
    Closed,
    Merged,
    All,
}

impl ListState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListState::Open => "open",
            ListState::Closed => "closed",
            ListState::Merged => "merged",
            ListState::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub state: ListState,
    pub head: Option<String>,
    pub base: Option<String>,
    pub limit: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            state: ListState::Open,
            head: None,
            base: None,
            limit: 30,
        }
    }
}
