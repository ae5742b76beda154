//! Merge conflict detection and automatic resolution.

use std::path::Path;

use super::WorkflowContext;
use crate::config::ConflictStrategy;
use crate::error::Result;
use crate::git::{PushOptions, PushResult, Vcs};
use crate::platform::PullRequestFacts;

const OURS_MARKER: &str = "<<<<<<<";
const THEIRS_MARKER: &str = ">>>>>>>";

/// Number of conflict hunks in `content`.
pub fn count_conflict_markers(content: &str) -> usize {
    let markers = content
        .lines()
        .filter(|l| l.starts_with(OURS_MARKER) || l.starts_with(THEIRS_MARKER))
        .count();
    markers / 2
}

/// Conflict hunks left in a file on disk; unreadable files count as zero.
pub fn conflict_markers_in_file(path: &Path) -> usize {
    match std::fs::read_to_string(path) {
        Ok(content) => count_conflict_markers(&content),
        Err(e) => {
            log::debug!("Could not read {}: {}", path.display(), e);
            0
        }
    }
}

/// How an automatic resolution attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Base integrated and pushed.
    Resolved,
    /// Files still conflicting (possibly empty when git gave no detail).
    Failed(Vec<String>),
}

/// Git-side conflict handling for the checked-out branch.
pub struct ConflictResolver<'a> {
    vcs: &'a dyn Vcs,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        Self { vcs }
    }

    /// Files with unresolved conflicts in the working tree.
    pub fn detect_local_conflicts(&self) -> Vec<String> {
        self.vcs.conflicted_files().unwrap_or_else(|e| {
            log::warn!("Could not list conflicted files: {}", e);
            Vec::new()
        })
    }

    /// Trial-merge `origin/<base>` and report the files that would conflict.
    pub fn detect_conflicts_with_base(&self, base: &str) -> Vec<String> {
        if let Err(e) = self.vcs.fetch(base) {
            log::warn!("Failed to fetch {}: {}", base, e);
        }
        self.vcs
            .trial_merge(&format!("origin/{}", base))
            .unwrap_or_else(|e| {
                log::warn!("Trial merge against {} failed: {}", base, e);
                Vec::new()
            })
    }

    /// Rebase onto or merge `origin/<base>`.
    ///
    /// On conflicts the operation is aborted, leaving the branch as it was,
    /// and the conflicting files are returned.
    pub fn attempt_resolution(
        &self,
        base: &str,
        strategy: ConflictStrategy,
    ) -> Result<(bool, Vec<String>)> {
        self.vcs.fetch(base)?;
        let upstream = format!("origin/{}", base);

        let applied = match strategy {
            ConflictStrategy::Rebase => self.vcs.rebase(&upstream)?,
            ConflictStrategy::Merge => self.vcs.merge(&upstream)?,
        };
        if applied {
            log::debug!("{} onto {} succeeded", strategy.as_str(), upstream);
            return Ok((true, Vec::new()));
        }

        let remaining = self.detect_local_conflicts();
        let aborted = match strategy {
            ConflictStrategy::Rebase => self.vcs.abort_rebase(),
            ConflictStrategy::Merge => self.vcs.abort_merge(),
        };
        if let Err(e) = aborted {
            log::warn!("Could not abort {}: {}", strategy.as_str(), e);
        }
        Ok((false, remaining))
    }

    /// Push the resolved branch; a rebase needs `force`.
    pub fn push_resolution(&self, branch: &str, force: bool) -> Result<bool> {
        let options = if force {
            PushOptions::force_with_lease()
        } else {
            PushOptions::default()
        };
        match self.vcs.push(branch, options)? {
            PushResult::Success | PushResult::AlreadyUpToDate => Ok(true),
            PushResult::Error(message) => {
                log::warn!("Push of resolved branch failed: {}", message);
                Ok(false)
            }
        }
    }
}

/// Try to clear the conflicts of a PR by integrating its base locally.
///
/// Fails without touching the repository when the PR's head branch is not
/// checked out.
pub fn resolve_pr_conflicts(
    ctx: &WorkflowContext,
    facts: &PullRequestFacts,
    strategy: ConflictStrategy,
) -> Result<Resolution> {
    if !facts.has_conflicts() {
        return Ok(Resolution::Resolved);
    }

    let current = ctx.vcs.current_branch()?;
    if current != facts.head_branch {
        ctx.warn(&format!(
            "Check out '{}' to resolve conflicts automatically (currently on '{}')",
            facts.head_branch, current
        ));
        return Ok(Resolution::Failed(Vec::new()));
    }

    let resolver = ConflictResolver::new(ctx.vcs);
    let base = facts.base_branch.as_str();

    let conflicts = resolver.detect_conflicts_with_base(base);
    if conflicts.is_empty() {
        ctx.warn("The platform reports conflicts but none were found locally. Fetch and try again.");
        return Ok(Resolution::Failed(Vec::new()));
    }

    ctx.step(&format!(
        "Attempting {} onto {} ({} conflicting file(s))...",
        strategy.as_str(),
        base,
        conflicts.len()
    ));
    let (applied, remaining) = resolver.attempt_resolution(base, strategy)?;
    if !applied {
        let files = if remaining.is_empty() { conflicts } else { remaining };
        return Ok(Resolution::Failed(files));
    }

    let force = strategy == ConflictStrategy::Rebase;
    if !resolver.push_resolution(&facts.head_branch, force)? {
        return Ok(Resolution::Failed(Vec::new()));
    }
    ctx.success(&format!("Conflicts resolved and pushed for PR #{}", facts.number));
    Ok(Resolution::Resolved)
}
