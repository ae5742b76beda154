//! Review summarizer and approval policy.

use crate::error::{AutoPrError, Result};
use crate::platform::{ReviewResult, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewSummary {
    pub total: usize,
    pub approved: usize,
    pub changes_requested: usize,
    pub commented: usize,
    pub pending: usize,
    pub dismissed: usize,
}

impl ReviewSummary {
    pub fn is_approved(&self) -> bool {
        self.approved > 0 && self.changes_requested == 0
    }

    pub fn needs_changes(&self) -> bool {
        self.changes_requested > 0
    }
}

/// Counts per state over `reviews` as given.
///
/// Backends already reduce them to the latest review per user
/// ([`crate::platform::latest_reviews`]).
pub fn summarize_reviews(reviews: &[ReviewResult]) -> ReviewSummary {
    let count = |state: ReviewState| reviews.iter().filter(|r| r.state == state).count();
    ReviewSummary {
        total: reviews.len(),
        approved: count(ReviewState::Approved),
        changes_requested: count(ReviewState::ChangesRequested),
        commented: count(ReviewState::Commented),
        pending: count(ReviewState::Pending),
        dismissed: count(ReviewState::Dismissed),
    }
}

/// Outcome of checking reviews against an approval quorum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalStatus {
    pub approved: bool,
    pub required: u32,
    pub approvals: u32,
    pub changes_requested_by: Vec<String>,
    pub message: String,
}

impl ApprovalStatus {
    /// Approvals still missing to reach the quorum.
    pub fn missing_approvals(&self) -> u32 {
        self.required.saturating_sub(self.approvals)
    }
}

pub fn check_approval_status(reviews: &[ReviewResult], required_approvals: u32) -> ApprovalStatus {
    let summary = summarize_reviews(reviews);
    let approvals = summary.approved as u32;

    if summary.needs_changes() {
        let requesters: Vec<String> = reviews
            .iter()
            .filter(|r| r.requests_changes())
            .map(|r| r.user.clone())
            .collect();
        return ApprovalStatus {
            approved: false,
            required: required_approvals,
            approvals,
            message: format!("Changes requested by: {}", requesters.join(", ")),
            changes_requested_by: requesters,
        };
    }

    if approvals >= required_approvals {
        return ApprovalStatus {
            approved: true,
            required: required_approvals,
            approvals,
            changes_requested_by: Vec::new(),
            message: format!("Approved by {} reviewer(s)", approvals),
        };
    }

    ApprovalStatus {
        approved: false,
        required: required_approvals,
        approvals,
        changes_requested_by: Vec::new(),
        message: format!(
            "Need {} more approval(s)",
            required_approvals - approvals
        ),
    }
}

/// Fail with [`AutoPrError::ReviewRequired`] unless the quorum is met.
pub fn ensure_approved(reviews: &[ReviewResult], required_approvals: u32) -> Result<ApprovalStatus> {
    let status = check_approval_status(reviews, required_approvals);
    if status.approved {
        Ok(status)
    } else {
        Err(AutoPrError::ReviewRequired {
            required: status.required,
            approved: status.approvals,
            changes_requested_by: status.changes_requested_by,
        })
    }
}
