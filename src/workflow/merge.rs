//! The merge workflow.
//!
//! Each round re-fetches the PR, derives its lifecycle state and acts on it.
//! Actions that change the PR (conflict resolution, retriggered checks,
//! waiting) end the round so the next one sees fresh facts. Rounds, check
//! retries and resolution attempts are all capped.

use std::time::Duration;

use super::checks::{handle_failed_checks, retrigger_checks, wait_for_checks, CheckAction, CheckWait};
use super::conflicts::{resolve_pr_conflicts, ConflictResolver, Resolution};
use super::status::resolve_pr_number;
use super::{GenerationOptions, WorkflowContext};
use crate::config::ConflictStrategy;
use crate::error::{AutoPrError, Result};
use crate::lifecycle::{check_approval_status, derive_state, ensure_approved, LifecycleState, PrStateMachine};
use crate::llm::split_title_body;
use crate::output::{print_conflict_guidance, print_merge_message};
use crate::platform::{CheckStatus, MergeMethod, MergeRequest, PullRequestFacts};
use crate::prompts::{build_merge_commit_prompt, PromptContext};

/// Upper bound on decision rounds in one run, whatever happens.
const MAX_ROUNDS: u32 = 25;
/// Automatic conflict resolutions attempted per run.
const MAX_RESOLUTION_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOptions {
    /// Defaults to the open PR of the current branch.
    pub pr_number: Option<u64>,
    /// Overrides `config.merge_method`.
    pub merge_method: Option<MergeMethod>,
    /// Generate and print the message without merging.
    pub message_only: bool,
    /// Skip the final confirmation (and confirm a missing review quorum).
    pub yes: bool,
    /// Overrides `config.auto_resolve`.
    pub auto_resolve: Option<bool>,
    /// Overrides `config.conflict_strategy`.
    pub strategy: Option<ConflictStrategy>,
    /// Fail on running checks instead of waiting.
    pub no_wait_checks: bool,
    /// Merge regardless of check results.
    pub ignore_checks: bool,
    /// Overrides `config.check_timeout_secs`.
    pub timeout: Option<Duration>,
    /// Delete the head branch after merging (in addition to `config.delete_branch`).
    pub delete_branch: bool,
    pub generation: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    AlreadyMerged {
        number: u64,
    },
    Merged {
        number: u64,
        url: String,
        method: MergeMethod,
        title: String,
    },
    /// `message_only`: the generated commit message, nothing merged.
    MessageOnly {
        number: u64,
        title: String,
        body: String,
    },
}

/// Counters carried across rounds.
struct Budget {
    rounds: u32,
    check_retries: u32,
    max_check_retries: u32,
    resolutions: u32,
}

impl Budget {
    fn next_round(&mut self, pr_number: u64) -> Result<()> {
        self.rounds += 1;
        if self.rounds > MAX_ROUNDS {
            return Err(AutoPrError::RetryLimitExceeded {
                pr_number,
                attempts: self.rounds - 1,
            });
        }
        Ok(())
    }

    fn spend_check_retry(&mut self, pr_number: u64) -> Result<()> {
        if self.check_retries >= self.max_check_retries {
            return Err(AutoPrError::RetryLimitExceeded {
                pr_number,
                attempts: self.check_retries,
            });
        }
        self.check_retries += 1;
        Ok(())
    }
}

/// Drive a PR to merged, or fail with the reason it cannot be merged.
pub fn merge_pr(ctx: &WorkflowContext, options: &MergeOptions) -> Result<MergeOutcome> {
    let number = resolve_pr_number(ctx, options.pr_number)?;
    let config = ctx.config;
    let auto_resolve = options.auto_resolve.unwrap_or(config.auto_resolve);
    let strategy = options.strategy.unwrap_or(config.conflict_strategy);
    let wait = config.wait_for_checks && !options.no_wait_checks;
    let timeout = options.timeout.unwrap_or_else(|| config.check_timeout());

    let mut machine = PrStateMachine::new(Some(number));
    let mut budget = Budget {
        rounds: 0,
        check_retries: 0,
        max_check_retries: config.max_check_retries,
        resolutions: 0,
    };

    let facts = loop {
        budget.next_round(number)?;
        let facts = ctx.platform.get_pr(number)?;
        let state = derive_state(&facts);
        machine.set_state(state);
        log::debug!("PR #{} round {}: {}", number, budget.rounds, state);

        match state {
            LifecycleState::Merged => {
                ctx.success(&format!("PR #{} is already merged", number));
                return Ok(MergeOutcome::AlreadyMerged { number });
            }
            LifecycleState::Closed => {
                return Err(blocked(number, "PR is closed"));
            }
            LifecycleState::Draft => {
                return Err(blocked(number, "PR is a draft; mark it ready for review first"));
            }
            LifecycleState::Conflict => {
                if !auto_resolve || budget.resolutions >= MAX_RESOLUTION_ATTEMPTS {
                    return Err(conflict_error(ctx, &facts, Vec::new()));
                }
                budget.resolutions += 1;
                machine.transition("start_resolution")?;
                match resolve_pr_conflicts(ctx, &facts, strategy)? {
                    Resolution::Resolved => {
                        machine.transition("resolution_complete")?;
                        continue;
                    }
                    Resolution::Failed(files) => {
                        machine.transition("resolution_failed")?;
                        return Err(conflict_error(ctx, &facts, files));
                    }
                }
            }
            LifecycleState::ChecksRunning | LifecycleState::ChecksFailed if options.ignore_checks => {
                ctx.warn("Ignoring check results as requested");
                review_policy(ctx, &facts, options.yes)?;
                break facts;
            }
            LifecycleState::ChecksRunning => {
                if !wait {
                    return Err(AutoPrError::ChecksPending {
                        pr_number: number,
                        checks: facts.pending_check_names(),
                    });
                }
                ctx.step(&format!("Waiting for checks on PR #{}...", number));
                if let CheckWait::TimedOut(checks) = wait_for_checks(ctx, number, timeout)? {
                    return Err(AutoPrError::ChecksPending {
                        pr_number: number,
                        checks: checks
                            .iter()
                            .filter(|c| c.is_pending())
                            .map(|c| c.name.clone())
                            .collect(),
                    });
                }
            }
            LifecycleState::ChecksFailed => {
                if !wait {
                    return Err(checks_failed(&facts));
                }
                match handle_failed_checks(ctx, &facts.checks) {
                    CheckAction::Continue => {}
                    CheckAction::Ignore => {
                        ctx.warn("Proceeding despite failed checks");
                        review_policy(ctx, &facts, options.yes)?;
                        break facts;
                    }
                    CheckAction::Abort => return Err(checks_failed(&facts)),
                    CheckAction::Retry => {
                        budget.spend_check_retry(number)?;
                        retrigger_checks(ctx, &facts.head_branch)?;
                        machine.transition("retry")?;
                        // Give CI a moment to register the new run.
                        ctx.clock.sleep(config.poll_interval());
                    }
                    CheckAction::Wait => {
                        budget.spend_check_retry(number)?;
                        ctx.step("Waiting longer for checks...");
                        ctx.clock.sleep(config.poll_interval());
                    }
                }
            }
            LifecycleState::ChangesRequested
            | LifecycleState::ReadyToMerge
            | LifecycleState::ReviewRequired => {
                review_policy(ctx, &facts, options.yes)?;
                break facts;
            }
            LifecycleState::Blocked => {
                let mut reasons = facts.blocking_reasons();
                if reasons.is_empty() {
                    reasons.push(not_mergeable_reason(&facts));
                }
                return Err(AutoPrError::PrBlocked {
                    pr_number: number,
                    reasons,
                });
            }
            // Nothing is failing, but the PR cannot be merged as it stands.
            LifecycleState::ChecksPassed
            | LifecycleState::Open
            | LifecycleState::Created
            | LifecycleState::Resolution => {
                return Err(blocked(number, &not_mergeable_reason(&facts)));
            }
        }
    };

    finish_merge(ctx, &mut machine, &facts, options)
}

/// Apply the review policy before merging.
///
/// A change request needs an interactive confirmation; `--yes` does not
/// override it. Otherwise the approval quorum applies.
fn review_policy(ctx: &WorkflowContext, facts: &PullRequestFacts, yes: bool) -> Result<()> {
    if facts.reviews.iter().any(|r| r.requests_changes()) {
        confirm_changes_requested(ctx, facts)
    } else {
        review_gate(ctx, facts, yes)
    }
}

fn confirm_changes_requested(ctx: &WorkflowContext, facts: &PullRequestFacts) -> Result<()> {
    let required = ctx.config.required_approvals;
    let status = check_approval_status(&facts.reviews, required);
    let question = format!("{}. Merge anyway?", status.message);
    if ctx.prompter.is_interactive() && ctx.prompter.confirm(&question, false) {
        return Ok(());
    }
    ensure_approved(&facts.reviews, required).map(|_| ())
}

/// Enforce the approval quorum once reviews exist.
///
/// A missing quorum can be confirmed interactively or with `--yes`.
fn review_gate(ctx: &WorkflowContext, facts: &PullRequestFacts, yes: bool) -> Result<()> {
    if facts.reviews.is_empty() {
        return Ok(());
    }
    let required = ctx.config.required_approvals;
    let status = check_approval_status(&facts.reviews, required);
    if status.approved {
        return Ok(());
    }
    if yes {
        ctx.warn(&format!("{}; merging anyway (--yes)", status.message));
        return Ok(());
    }
    let question = format!("{}. Merge anyway?", status.message);
    if ctx.prompter.is_interactive() && ctx.prompter.confirm(&question, false) {
        return Ok(());
    }
    ensure_approved(&facts.reviews, required).map(|_| ())
}

fn not_mergeable_reason(facts: &PullRequestFacts) -> String {
    if facts.mergeable != Some(false) && !facts.checks_passed() {
        let unsuccessful: Vec<&str> = facts
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Completed && !c.is_successful())
            .map(|c| c.name.as_str())
            .collect();
        return format!("Not every check succeeded: {}", unsuccessful.join(", "));
    }
    let detail = facts.mergeable_state.map(|s| s.as_str()).unwrap_or("unknown");
    format!("Platform reports the PR as not mergeable ({})", detail)
}

fn blocked(pr_number: u64, reason: &str) -> AutoPrError {
    AutoPrError::PrBlocked {
        pr_number,
        reasons: vec![reason.to_string()],
    }
}

fn checks_failed(facts: &PullRequestFacts) -> AutoPrError {
    AutoPrError::ChecksFailed {
        pr_number: facts.number,
        checks: facts.failed_check_names(),
    }
}

/// Show manual resolution steps and build the conflict error.
///
/// Without known files, a trial merge lists them when the head branch is
/// checked out.
fn conflict_error(
    ctx: &WorkflowContext,
    facts: &PullRequestFacts,
    files: Vec<String>,
) -> AutoPrError {
    let files = if files.is_empty() && is_checked_out(ctx, &facts.head_branch) {
        ConflictResolver::new(ctx.vcs).detect_conflicts_with_base(&facts.base_branch)
    } else {
        files
    };
    if !ctx.quiet {
        print_conflict_guidance(&facts.base_branch, &facts.head_branch, &files);
    }
    AutoPrError::MergeConflict {
        pr_number: facts.number,
        files,
    }
}

/// Generate the merge commit message and merge.
fn finish_merge(
    ctx: &WorkflowContext,
    machine: &mut PrStateMachine,
    facts: &PullRequestFacts,
    options: &MergeOptions,
) -> Result<MergeOutcome> {
    let number = facts.number;
    let method = options.merge_method.unwrap_or(ctx.config.merge_method);
    let range = format!("origin/{}...origin/{}", facts.base_branch, facts.head_branch);

    ctx.step("Generating merge commit message...");
    ctx.vcs.fetch(&facts.base_branch)?;
    ctx.vcs.fetch(&facts.head_branch)?;
    let diff = ctx.vcs.diff(&range)?;
    let diff_stat = ctx.vcs.diff_stat(&range)?;

    let prompt_ctx = PromptContext {
        head: &facts.head_branch,
        base: &facts.base_branch,
        diff: &diff,
        diff_stat: &diff_stat,
        hint: options.generation.hint.as_deref(),
        language: options.generation.language(ctx.config),
    };
    let prompt = build_merge_commit_prompt(&prompt_ctx, number, &facts.title, &facts.body, method.as_str());
    let message = ctx.generate(prompt, &options.generation)?;
    let (mut title, body) = split_title_body(&message);
    if title.is_empty() {
        title = format!("{} (#{})", facts.title, number);
    }

    if !ctx.quiet {
        print_merge_message(&title, &body);
    }
    if options.message_only {
        return Ok(MergeOutcome::MessageOnly { number, title, body });
    }

    if !options.yes && !ctx.prompter.confirm(&format!("Merge PR #{} ({})?", number, method), true) {
        return Err(AutoPrError::Aborted(format!("Merge of PR #{} cancelled", number)));
    }

    if machine.can_transition("merge") {
        machine.transition("merge")?;
    }
    let delete_branch = options.delete_branch || ctx.config.delete_branch;
    let request = MergeRequest {
        method,
        commit_title: Some(title.clone()),
        commit_message: Some(body),
        delete_branch,
    };
    ctx.step(&format!("Merging PR #{} ({})...", number, method));
    if !ctx.platform.merge_pr(number, &request)? {
        return Err(blocked(number, "The platform refused the merge"));
    }
    if delete_branch {
        delete_local_branch(ctx, &facts.head_branch);
    }

    Ok(MergeOutcome::Merged {
        number,
        url: facts.url.clone(),
        method,
        title,
    })
}

/// Best effort: the remote branch is removed by the platform, the local
/// copy only when it is not checked out.
fn delete_local_branch(ctx: &WorkflowContext, branch: &str) {
    if is_checked_out(ctx, branch) {
        ctx.info(&format!("Keeping local branch '{}' because it is checked out", branch));
        return;
    }
    match ctx.vcs.branch_exists(branch) {
        Ok(true) => {
            if let Err(e) = ctx.vcs.delete_branch(branch, false) {
                ctx.warn(&format!("Could not delete local branch '{}': {}", branch, e));
            }
        }
        Ok(false) => {}
        Err(e) => log::debug!("Could not look up local branch '{}': {}", branch, e),
    }
}

fn is_checked_out(ctx: &WorkflowContext, branch: &str) -> bool {
    ctx.vcs.current_branch().ok().as_deref() == Some(branch)
}
