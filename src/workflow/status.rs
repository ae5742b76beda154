//! Status of a single PR.

use super::WorkflowContext;
use crate::error::{AutoPrError, Result};
use crate::git::AheadBehind;
use crate::lifecycle::{check_approval_status, ApprovalStatus, LifecycleState, PrStateMachine};
use crate::platform::{PullRequestFacts, RepoInfo};

/// Everything the `status` command shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PrStatus {
    pub facts: PullRequestFacts,
    pub state: LifecycleState,
    pub valid_triggers: Vec<&'static str>,
    pub approval: ApprovalStatus,
    /// Only known when the head branch is checked out.
    pub ahead_behind: Option<AheadBehind>,
    pub repo: Option<RepoInfo>,
}

/// The explicit PR number, or the open PR for the current branch.
pub fn resolve_pr_number(ctx: &WorkflowContext, explicit: Option<u64>) -> Result<u64> {
    if let Some(number) = explicit {
        return Ok(number);
    }
    let branch = ctx.vcs.current_branch()?;
    match ctx.platform.find_pr_for_branch(&branch, None)? {
        Some(pr) => {
            log::debug!("Branch '{}' has PR #{}", branch, pr.number);
            Ok(pr.number)
        }
        None => Err(AutoPrError::Platform(format!(
            "No open pull request for branch '{}'. Pass --pr-number or run create-pr first.",
            branch
        ))),
    }
}

pub fn pr_status(ctx: &WorkflowContext, pr_number: Option<u64>) -> Result<PrStatus> {
    let number = resolve_pr_number(ctx, pr_number)?;
    let facts = ctx.platform.get_pr(number)?;
    let machine = PrStateMachine::from_facts(&facts);
    let approval = check_approval_status(&facts.reviews, ctx.config.required_approvals);

    Ok(PrStatus {
        state: machine.current_state(),
        valid_triggers: machine.valid_triggers(),
        approval,
        ahead_behind: local_ahead_behind(ctx, &facts),
        repo: ctx
            .platform
            .get_repo_info()
            .map_err(|e| log::debug!("repository info unavailable: {}", e))
            .ok(),
        facts,
    })
}

fn local_ahead_behind(ctx: &WorkflowContext, facts: &PullRequestFacts) -> Option<AheadBehind> {
    let current = ctx.vcs.current_branch().ok()?;
    if current != facts.head_branch {
        return None;
    }
    if let Err(e) = ctx.vcs.fetch(&facts.base_branch) {
        log::warn!("Failed to fetch {}: {}", facts.base_branch, e);
    }
    ctx.vcs
        .ahead_behind("HEAD", &format!("origin/{}", facts.base_branch))
        .map_err(|e| log::debug!("ahead/behind unavailable: {}", e))
        .ok()
}
