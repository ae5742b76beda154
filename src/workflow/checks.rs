//! Waiting on CI and deciding what to do when it fails.

use std::time::Duration;

use super::WorkflowContext;
use crate::error::{AutoPrError, Result};
use crate::git::{PushOptions, PushResult};
use crate::lifecycle::{categorize_failures, summarize_checks};
use crate::output::{GRAY, RED, RESET, YELLOW};
use crate::platform::CheckResult;
use crate::progress::CheckSpinner;

/// What to do about failed checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAction {
    /// Nothing failed.
    Continue,
    /// Amend and force-push to rerun CI.
    Retry,
    /// Merge despite the failures.
    Ignore,
    Abort,
    /// Give the checks more time.
    Wait,
}

impl CheckAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckAction::Continue => "continue",
            CheckAction::Retry => "retry",
            CheckAction::Ignore => "ignore",
            CheckAction::Abort => "abort",
            CheckAction::Wait => "wait",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "retry" => CheckAction::Retry,
            "ignore" => CheckAction::Ignore,
            "wait" => CheckAction::Wait,
            "continue" => CheckAction::Continue,
            _ => CheckAction::Abort,
        }
    }
}

const BLOCKING_CHOICES: [&str; 3] = ["abort", "retry", "wait"];
const FLAKY_CHOICES: [&str; 4] = ["retry", "ignore", "abort", "wait"];

/// How a wait for checks ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckWait {
    Passed(Vec<CheckResult>),
    Failed(Vec<CheckResult>),
    /// Deadline reached with checks still running.
    TimedOut(Vec<CheckResult>),
}

impl CheckWait {
    pub fn checks(&self) -> &[CheckResult] {
        match self {
            CheckWait::Passed(c) | CheckWait::Failed(c) | CheckWait::TimedOut(c) => c,
        }
    }
}

/// Poll the platform until every check completes or `timeout` elapses.
///
/// The deadline is checked before each sleep and the last sleep is cut short
/// at the deadline, so the final poll happens right at the timeout.
pub fn wait_for_checks(ctx: &WorkflowContext, pr_number: u64, timeout: Duration) -> Result<CheckWait> {
    let interval = ctx.config.poll_interval();
    let start = ctx.clock.now();
    let deadline = start + timeout;
    let spinner = CheckSpinner::new(pr_number, ctx.quiet);
    let mut last_status = String::new();

    loop {
        let checks = ctx.platform.get_checks(pr_number)?;
        let summary = summarize_checks(&checks);
        let elapsed = ctx.clock.now().saturating_duration_since(start);

        let status = summary.status_line();
        if status != last_status {
            log::debug!("PR #{} checks: {}", pr_number, status);
            last_status = status;
        }
        spinner.update(&summary, elapsed);

        if summary.is_complete() {
            if summary.all_passed() {
                spinner.finish_success(&summary, elapsed);
                return Ok(CheckWait::Passed(checks));
            }
            spinner.finish_failure(&summary, elapsed);
            return Ok(CheckWait::Failed(checks));
        }

        let now = ctx.clock.now();
        if now >= deadline {
            spinner.finish_timeout(&summary, elapsed);
            log::warn!(
                "Timed out after {:?} with {} check(s) pending on PR #{}",
                timeout,
                summary.pending,
                pr_number
            );
            return Ok(CheckWait::TimedOut(checks));
        }
        ctx.clock.sleep(interval.min(deadline - now));
    }
}

fn print_failures(label: &str, color: &str, checks: &[CheckResult]) {
    if checks.is_empty() {
        return;
    }
    println!();
    println!("{color}{}{RESET}", label);
    for check in checks {
        let conclusion = check.conclusion.map(|c| c.as_str()).unwrap_or("unknown");
        match &check.url {
            Some(url) => println!("  - {}: {} {GRAY}({}){RESET}", check.name, conclusion, url),
            None => println!("  - {}: {}", check.name, conclusion),
        }
    }
}

/// Report failed checks and ask what to do.
///
/// Non-interactive runs always abort. Blocking failures default to abort;
/// when every failure looks flaky, retry is the default.
pub fn handle_failed_checks(ctx: &WorkflowContext, checks: &[CheckResult]) -> CheckAction {
    let failures = categorize_failures(checks);
    if failures.is_empty() {
        return CheckAction::Continue;
    }

    if !ctx.quiet {
        println!();
        println!("{RED}CI checks failed{RESET}");
        print_failures("Blocking failures:", RED, &failures.blocking);
        print_failures("Potentially flaky failures:", YELLOW, &failures.flaky);
    }

    if !ctx.prompter.is_interactive() {
        return CheckAction::Abort;
    }

    let choices: &[&str] = if failures.only_flaky() {
        ctx.info("Only flaky checks failed. A retry may help.");
        &FLAKY_CHOICES
    } else {
        ctx.warn("Blocking checks must be fixed before merging.");
        &BLOCKING_CHOICES
    };
    let picked = ctx.prompter.select("What would you like to do?", choices, 0);
    let action = choices
        .get(picked)
        .map(|c| CheckAction::parse(c))
        .unwrap_or(CheckAction::Abort);
    log::debug!("Failed-check action: {}", action.as_str());
    action
}

/// Rerun CI by amending the head commit and force-pushing it.
///
/// `branch` must be checked out; the amend rewrites the current HEAD.
pub fn retrigger_checks(ctx: &WorkflowContext, branch: &str) -> Result<()> {
    let current = ctx.vcs.current_branch()?;
    if current != branch {
        return Err(AutoPrError::Git(format!(
            "Check out '{}' to retrigger its checks (currently on '{}'), or rerun them from the platform",
            branch, current
        )));
    }
    ctx.step("Retriggering checks with an amended commit...");
    ctx.vcs.amend_no_edit()?;
    match ctx.vcs.push(branch, PushOptions::force_with_lease())? {
        PushResult::Success | PushResult::AlreadyUpToDate => {
            ctx.success("Checks retriggered");
            Ok(())
        }
        PushResult::Error(message) => Err(AutoPrError::Git(format!(
            "Failed to retrigger checks: {}",
            message
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{CheckConclusion, Platform, PullRequestFacts};
    use crate::test_utils::{FakePlatform, FakeVcs, Harness, ScriptedPrompter};

    fn facts_with(checks: Vec<CheckResult>) -> PullRequestFacts {
        let mut facts = PullRequestFacts::open(7, "feature", "main");
        facts.checks = checks;
        facts
    }

    // ========================================================================
    // wait_for_checks
    // ========================================================================

    #[test]
    fn test_wait_returns_once_checks_complete() {
        let h = Harness::new(FakePlatform::single(facts_with(vec![CheckResult::completed(
            "build",
            CheckConclusion::Success,
        )])));

        let result = wait_for_checks(&h.ctx(), 7, Duration::from_secs(600)).unwrap();

        assert!(matches!(result, CheckWait::Passed(_)));
        assert_eq!(h.clock.sleeps.get(), 0);
    }

    #[test]
    fn test_wait_reports_failures() {
        let h = Harness::new(FakePlatform::single(facts_with(vec![CheckResult::completed(
            "lint",
            CheckConclusion::Failure,
        )])));

        let result = wait_for_checks(&h.ctx(), 7, Duration::from_secs(600)).unwrap();

        assert!(matches!(result, CheckWait::Failed(ref c) if c.len() == 1));
    }

    #[test]
    fn test_wait_times_out_at_deadline() {
        let h = Harness::new(FakePlatform::single(facts_with(vec![CheckResult::running(
            "build",
        )])));

        // 600s timeout, 30s interval: 20 sleeps, then the poll at the deadline.
        let result = wait_for_checks(&h.ctx(), 7, Duration::from_secs(600)).unwrap();

        assert!(matches!(result, CheckWait::TimedOut(_)));
        assert_eq!(h.clock.sleeps.get(), 20);
        assert_eq!(h.platform.call_count("get_checks"), 21);
    }

    #[test]
    fn test_wait_shortens_last_sleep_to_deadline() {
        let h = Harness::new(FakePlatform::single(facts_with(vec![CheckResult::running(
            "build",
        )])));

        wait_for_checks(&h.ctx(), 7, Duration::from_secs(45)).unwrap();

        // 30s, then 15s up to the deadline.
        assert_eq!(h.clock.sleeps.get(), 2);
    }

    #[test]
    fn test_wait_sees_checks_finish_between_polls() {
        let running = facts_with(vec![CheckResult::running("build")]);
        let done = facts_with(vec![CheckResult::completed("build", CheckConclusion::Success)]);
        // get_checks reads the head snapshot; get_pr advances it.
        let platform = FakePlatform::new(vec![running, done]);
        let h = Harness::new(platform);
        let ctx = h.ctx();

        assert!(matches!(
            wait_for_checks(&ctx, 7, Duration::ZERO).unwrap(),
            CheckWait::TimedOut(_)
        ));
        h.platform.get_pr(7).unwrap();
        assert!(matches!(
            wait_for_checks(&ctx, 7, Duration::ZERO).unwrap(),
            CheckWait::Passed(_)
        ));
    }

    // ========================================================================
    // handle_failed_checks
    // ========================================================================

    #[test]
    fn test_no_failures_continue() {
        let h = Harness::new(FakePlatform::new(vec![]));
        let checks = vec![CheckResult::completed("build", CheckConclusion::Success)];
        assert_eq!(handle_failed_checks(&h.ctx(), &checks), CheckAction::Continue);
    }

    #[test]
    fn test_non_interactive_aborts() {
        let h = Harness::new(FakePlatform::new(vec![]));
        let checks = vec![CheckResult::completed("e2e-visual", CheckConclusion::Failure)];
        assert_eq!(handle_failed_checks(&h.ctx(), &checks), CheckAction::Abort);
        assert!(h.prompter.asked.borrow().is_empty());
    }

    #[test]
    fn test_flaky_only_offers_retry_first() {
        let h = Harness {
            prompter: ScriptedPrompter::interactive(),
            ..Harness::new(FakePlatform::new(vec![]))
        };
        let checks = vec![CheckResult::completed("e2e-visual", CheckConclusion::Failure)];

        let action = handle_failed_checks(&h.ctx(), &checks);

        assert_eq!(action, CheckAction::Retry);
        let asked = h.prompter.asked.borrow();
        assert_eq!(asked[0].1, vec!["retry", "ignore", "abort", "wait"]);
        assert_eq!(asked[0].2, 0);
    }

    #[test]
    fn test_blocking_failure_defaults_to_abort() {
        let h = Harness {
            prompter: ScriptedPrompter::interactive(),
            ..Harness::new(FakePlatform::new(vec![]))
        };
        let checks = vec![
            CheckResult::completed("unit-tests", CheckConclusion::Failure),
            CheckResult::completed("integration", CheckConclusion::TimedOut),
        ];

        let action = handle_failed_checks(&h.ctx(), &checks);

        assert_eq!(action, CheckAction::Abort);
        assert_eq!(h.prompter.asked.borrow()[0].1, vec!["abort", "retry", "wait"]);
    }

    #[test]
    fn test_blocking_failure_user_picks_wait() {
        let h = Harness {
            prompter: ScriptedPrompter::interactive().selecting(&[2]),
            ..Harness::new(FakePlatform::new(vec![]))
        };
        let checks = vec![CheckResult::completed("build", CheckConclusion::Failure)];
        assert_eq!(handle_failed_checks(&h.ctx(), &checks), CheckAction::Wait);
    }

    // ========================================================================
    // retrigger_checks
    // ========================================================================

    #[test]
    fn test_retrigger_amends_then_force_pushes() {
        let h = Harness::new(FakePlatform::new(vec![]));

        retrigger_checks(&h.ctx(), "feature").unwrap();

        let calls = h.vcs.calls.borrow();
        assert_eq!(calls[0], "amend");
        assert_eq!(calls[1], "push feature --force-with-lease");
    }

    #[test]
    fn test_retrigger_push_rejection_is_an_error() {
        let h = Harness::new(FakePlatform::new(vec![]));
        *h.vcs.push_result.borrow_mut() = PushResult::Error("stale info".into());

        let err = retrigger_checks(&h.ctx(), "feature").unwrap_err();

        assert!(matches!(err, AutoPrError::Git(ref m) if m.contains("stale info")));
    }

    #[test]
    fn test_retrigger_refuses_other_checked_out_branch() {
        let h = Harness {
            vcs: FakeVcs::on_branch("main"),
            ..Harness::new(FakePlatform::new(vec![]))
        };

        let err = retrigger_checks(&h.ctx(), "feature").unwrap_err();

        assert!(matches!(err, AutoPrError::Git(ref m) if m.contains("Check out 'feature'")));
        assert!(!h.vcs.called("amend"));
        assert!(!h.vcs.called("push"));
    }
}
