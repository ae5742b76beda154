//! Lifecycle states and the deriver that maps PR facts onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::platform::PullRequestFacts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Open,
    Draft,
    ChecksRunning,
    ChecksPassed,
    ChecksFailed,
    Conflict,
    Resolution,
    Blocked,
    ReviewRequired,
    ChangesRequested,
    ReadyToMerge,
    Merged,
    Closed,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 14] = [
        LifecycleState::Created,
        LifecycleState::Open,
        LifecycleState::Draft,
        LifecycleState::ChecksRunning,
        LifecycleState::ChecksPassed,
        LifecycleState::ChecksFailed,
        LifecycleState::Conflict,
        LifecycleState::Resolution,
        LifecycleState::Blocked,
        LifecycleState::ReviewRequired,
        LifecycleState::ChangesRequested,
        LifecycleState::ReadyToMerge,
        LifecycleState::Merged,
        LifecycleState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Open => "open",
            LifecycleState::Draft => "draft",
            LifecycleState::ChecksRunning => "checks_running",
            LifecycleState::ChecksPassed => "checks_passed",
            LifecycleState::ChecksFailed => "checks_failed",
            LifecycleState::Conflict => "conflict",
            LifecycleState::Resolution => "resolution",
            LifecycleState::Blocked => "blocked",
            LifecycleState::ReviewRequired => "review_required",
            LifecycleState::ChangesRequested => "changes_requested",
            LifecycleState::ReadyToMerge => "ready_to_merge",
            LifecycleState::Merged => "merged",
            LifecycleState::Closed => "closed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LifecycleState::Created => "PR created, not yet published",
            LifecycleState::Open => "PR is open",
            LifecycleState::Draft => "PR is a draft",
            LifecycleState::ChecksRunning => "CI/CD checks are running",
            LifecycleState::ChecksPassed => "All checks passed",
            LifecycleState::ChecksFailed => "Some checks failed",
            LifecycleState::Conflict => "Merge conflicts detected",
            LifecycleState::Resolution => "Resolving conflicts",
            LifecycleState::Blocked => "PR is blocked from merging",
            LifecycleState::ReviewRequired => "Waiting for reviews",
            LifecycleState::ChangesRequested => "Changes have been requested",
            LifecycleState::ReadyToMerge => "Ready to merge",
            LifecycleState::Merged => "PR has been merged",
            LifecycleState::Closed => "PR has been closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Merged | LifecycleState::Closed)
    }

    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            LifecycleState::Conflict
                | LifecycleState::ChecksFailed
                | LifecycleState::Blocked
                | LifecycleState::ChangesRequested
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Map a facts snapshot to exactly one lifecycle state.
///
/// Conditions are evaluated in a fixed priority order and the first match
/// wins. A draft with failing checks is DRAFT; a PR with conflicts and
/// pending checks is CONFLICT. Changing the order changes merge decisions.
pub fn derive_state(facts: &PullRequestFacts) -> LifecycleState {
    if facts.is_merged() {
        return LifecycleState::Merged;
    }
    if !facts.is_open() {
        return LifecycleState::Closed;
    }
    if facts.is_draft() {
        return LifecycleState::Draft;
    }
    if facts.has_conflicts() {
        return LifecycleState::Conflict;
    }
    if facts.checks_pending() {
        return LifecycleState::ChecksRunning;
    }
    if facts.checks_failed() {
        return LifecycleState::ChecksFailed;
    }
    if facts.reviews.iter().any(|r| r.requests_changes()) {
        return LifecycleState::ChangesRequested;
    }
    if !facts.reviews.is_empty() && !facts.is_approved() {
        return LifecycleState::ReviewRequired;
    }
    if !facts.blocking_reasons().is_empty() {
        return LifecycleState::Blocked;
    }
    if facts.can_merge() {
        return LifecycleState::ReadyToMerge;
    }
    if facts.checks_passed() {
        return LifecycleState::ChecksPassed;
    }
    LifecycleState::Open
}
