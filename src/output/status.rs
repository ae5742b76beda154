//! Lifecycle status display.

use crate::git::AheadBehind;
use crate::lifecycle::{CheckSummary, LifecycleState};
use crate::platform::{CheckResult, PullRequestFacts, RepoInfo, ReviewResult, ReviewState};

use super::colors::*;

const NAME_COLUMN_WIDTH: usize = 36;

/// Color used for a lifecycle state label.
pub fn state_color(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::ReadyToMerge | LifecycleState::ChecksPassed | LifecycleState::Merged => GREEN,
        LifecycleState::ChecksRunning
        | LifecycleState::ReviewRequired
        | LifecycleState::Draft
        | LifecycleState::Resolution => YELLOW,
        LifecycleState::Closed | LifecycleState::Created | LifecycleState::Open => GRAY,
        _ if state.needs_attention() => RED,
        _ => CYAN,
    }
}

fn check_icon(check: &CheckResult) -> (&'static str, &'static str) {
    if check.is_pending() {
        ("◌", YELLOW)
    } else if check.is_failed() {
        ("✗", RED)
    } else if check.is_skipped() {
        ("-", GRAY)
    } else {
        ("✓", GREEN)
    }
}

fn check_label(check: &CheckResult) -> String {
    match (&check.conclusion, check.is_pending()) {
        (_, true) => check.status.as_str().replace('_', " "),
        (Some(conclusion), false) => conclusion.as_str().replace('_', " "),
        (None, false) => "unknown".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// One line per check: icon, name, result, link.
pub fn print_checks_table(checks: &[CheckResult]) {
    if checks.is_empty() {
        println!("  {GRAY}No checks reported{RESET}");
        return;
    }
    for check in checks {
        let (icon, color) = check_icon(check);
        let url = check.url.as_deref().unwrap_or("");
        println!(
            "  {color}{}{RESET} {:<width$} {color}{:<12}{RESET} {GRAY}{}{RESET}",
            icon,
            truncate(&check.name, NAME_COLUMN_WIDTH),
            check_label(check),
            url,
            width = NAME_COLUMN_WIDTH
        );
    }
}

pub fn print_check_summary(summary: &CheckSummary) {
    let color = if summary.has_failures() {
        RED
    } else if !summary.is_complete() {
        YELLOW
    } else {
        GREEN
    };
    println!(
        "{color}Checks:{RESET} {} {GRAY}({} total, {} skipped){RESET}",
        summary.status_line(),
        summary.total,
        summary.skipped
    );
}

pub fn print_reviews_table(reviews: &[ReviewResult]) {
    if reviews.is_empty() {
        println!("  {GRAY}No reviews yet{RESET}");
        return;
    }
    for review in reviews {
        let (icon, color) = match review.state {
            ReviewState::Approved => ("✓", GREEN),
            ReviewState::ChangesRequested => ("✗", RED),
            ReviewState::Commented => ("💬", CYAN),
            ReviewState::Pending => ("◌", YELLOW),
            ReviewState::Dismissed => ("-", GRAY),
        };
        println!(
            "  {color}{}{RESET} {:<24} {color}{}{RESET}",
            icon,
            review.user,
            review.state.as_str()
        );
    }
}

pub fn print_blocking_reasons(reasons: &[String]) {
    if reasons.is_empty() {
        return;
    }
    println!("{RED}{BOLD}Blocking:{RESET}");
    for reason in reasons {
        println!("  {RED}•{RESET} {}", reason);
    }
}

/// Full status view for one PR.
pub fn print_pr_status(
    repo: Option<&RepoInfo>,
    facts: &PullRequestFacts,
    state: LifecycleState,
    required_approvals: u32,
    valid_triggers: &[&str],
    ahead_behind: Option<AheadBehind>,
) {
    let color = state_color(state);
    println!();
    if let Some(repo) = repo {
        println!("{GRAY}{}/{}{RESET}", repo.owner, repo.repo);
    }
    println!("{BOLD}PR #{}{RESET} {}", facts.number, facts.title);
    println!("{GRAY}{}{RESET}", facts.url);
    println!();
    println!("{BLUE}State:{RESET}     {color}{BOLD}{}{RESET} {GRAY}({}){RESET}", state, state.description());
    println!(
        "{BLUE}Branch:{RESET}    {CYAN}{}{RESET} → {}",
        facts.head_branch, facts.base_branch
    );
    if let Some(author) = &facts.author {
        println!("{BLUE}Author:{RESET}    {}", author);
    }
    if let Some(counts) = ahead_behind {
        println!(
            "{BLUE}Commits:{RESET}   {} ahead, {} behind {}",
            counts.ahead, counts.behind, facts.base_branch
        );
    }
    if !facts.labels.is_empty() {
        let labels: Vec<&str> = facts.labels.iter().map(String::as_str).collect();
        println!("{BLUE}Labels:{RESET}    {}", labels.join(", "));
    }

    println!();
    print_check_summary(&crate::lifecycle::summarize_checks(&facts.checks));
    print_checks_table(&facts.checks);

    println!();
    let approvals = facts.reviews.iter().filter(|r| r.is_approved()).count();
    println!(
        "{BLUE}Reviews:{RESET} {}/{} approval(s)",
        approvals, required_approvals
    );
    print_reviews_table(&facts.reviews);
    let pending = facts.pending_reviewers();
    if !pending.is_empty() {
        println!("{GRAY}Awaiting review from: {}{RESET}", pending.join(", "));
    }

    let reasons = facts.blocking_reasons();
    if !reasons.is_empty() {
        println!();
        print_blocking_reasons(&reasons);
    }

    if !valid_triggers.is_empty() {
        println!();
        println!("{GRAY}Next steps: {}{RESET}", valid_triggers.join(", "));
    }
    println!();
}

/// Instructions for resolving conflicts by hand.
pub fn conflict_guidance(base: &str, head: &str, files: &[String]) -> String {
    let mut text = String::new();
    if !files.is_empty() {
        text.push_str("Conflicting files:\n");
        for file in files {
            text.push_str(&format!("  - {}\n", file));
        }
        text.push('\n');
    }
    text.push_str(&format!(
        "Option 1 - Rebase (clean history):\n  git checkout {head}\n  git fetch origin {base}\n  git rebase origin/{base}\n  # fix conflicts, then: git add <files> && git rebase --continue\n  git push --force-with-lease\n\n\
         Option 2 - Merge (keeps history):\n  git checkout {head}\n  git fetch origin {base}\n  git merge origin/{base}\n  # fix conflicts, then: git add <files> && git commit\n  git push\n\n\
         Option 3 - Let auto-pr try:\n  auto-pr merge-pr --auto-resolve\n",
        head = head,
        base = base
    ));
    text
}

pub fn print_conflict_guidance(base: &str, head: &str, files: &[String]) {
    println!();
    println!("{YELLOW}{BOLD}Merge conflicts with {}{RESET}", base);
    println!();
    for line in conflict_guidance(base, head, files).lines() {
        if line.starts_with("Option") || line.starts_with("Conflicting") {
            println!("{BOLD}{}{RESET}", line);
        } else if line.trim_start().starts_with('#') {
            println!("{GRAY}{}{RESET}", line);
        } else {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::CheckConclusion;

    #[test]
    fn test_state_colors() {
        assert_eq!(state_color(LifecycleState::ReadyToMerge), GREEN);
        assert_eq!(state_color(LifecycleState::Conflict), RED);
        assert_eq!(state_color(LifecycleState::ChecksRunning), YELLOW);
        assert_eq!(state_color(LifecycleState::Closed), GRAY);
    }

    #[test]
    fn test_check_labels() {
        assert_eq!(check_label(&CheckResult::running("build")), "in progress");
        assert_eq!(
            check_label(&CheckResult::completed("build", CheckConclusion::TimedOut)),
            "timed out"
        );
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-check-name", 10), "a-very-...");
    }

    #[test]
    fn test_conflict_guidance_lists_files_and_commands() {
        let text = conflict_guidance("main", "feature/x", &["src/lib.rs".to_string()]);
        assert!(text.contains("  - src/lib.rs"));
        assert!(text.contains("git rebase origin/main"));
        assert!(text.contains("git merge origin/main"));
        assert!(text.contains("git checkout feature/x"));
    }

    #[test]
    fn test_print_pr_status_smoke() {
        let mut facts = PullRequestFacts::open(3, "feature", "main");
        facts.checks = vec![CheckResult::completed("e2e-visual", CheckConclusion::Failure)];
        let repo = RepoInfo {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            url: "https://github.com/acme/widgets".to_string(),
        };
        print_pr_status(
            Some(&repo),
            &facts,
            LifecycleState::ChecksFailed,
            1,
            &["retry", "blocked"],
            Some(AheadBehind { ahead: 2, behind: 0 }),
        );
    }
}
