//! Check summarizer.
//!
//! Reduces a list of check results to counts and splits failures into
//! flaky and blocking sets.

use crate::platform::CheckResult;

/// Name fragments that mark a check as likely flaky.
pub const FLAKY_PATTERNS: [&str; 5] = ["e2e", "integration", "visual", "flaky", "unstable"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
}

impl CheckSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.pending == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// One-line progress text, e.g. `3 passed, 1 failed, 2 pending`.
    pub fn status_line(&self) -> String {
        format!(
            "{} passed, {} failed, {} pending",
            self.passed, self.failed, self.pending
        )
    }
}

pub fn summarize_checks(checks: &[CheckResult]) -> CheckSummary {
    CheckSummary {
        total: checks.len(),
        passed: checks.iter().filter(|c| c.is_successful()).count(),
        failed: checks.iter().filter(|c| c.is_failed()).count(),
        pending: checks.iter().filter(|c| c.is_pending()).count(),
        skipped: checks.iter().filter(|c| c.is_skipped()).count(),
    }
}

pub fn is_flaky(check: &CheckResult) -> bool {
    let name = check.name.to_lowercase();
    FLAKY_PATTERNS.iter().any(|p| name.contains(p))
}

/// Failed checks split into suspected-flaky and blocking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FailureCategories {
    pub flaky: Vec<CheckResult>,
    pub blocking: Vec<CheckResult>,
}

impl FailureCategories {
    pub fn is_empty(&self) -> bool {
        self.flaky.is_empty() && self.blocking.is_empty()
    }

    /// True when something failed and every failure looks flaky.
    pub fn only_flaky(&self) -> bool {
        !self.flaky.is_empty() && self.blocking.is_empty()
    }
}

pub fn categorize_failures(checks: &[CheckResult]) -> FailureCategories {
    let (flaky, blocking) = checks
        .iter()
        .filter(|c| c.is_failed())
        .cloned()
        .partition(is_flaky);
    FailureCategories { flaky, blocking }
}
