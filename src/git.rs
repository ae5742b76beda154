//! Version-control collaborator.
//!
//! Workflows talk to git through the [`Vcs`] trait; [`GitCli`] runs the `git`
//! binary in the current directory.

use crate::error::{AutoPrError, Result};
use std::process::{Command, Output};

/// Result type for push operations
#[derive(Debug, Clone, PartialEq)]
pub enum PushResult {
    /// Push succeeded
    Success,
    /// Branch already up-to-date on remote
    AlreadyUpToDate,
    /// Push failed with error message
    Error(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub force_with_lease: bool,
    pub set_upstream: bool,
}

impl PushOptions {
    pub fn upstream() -> Self {
        Self {
            force_with_lease: false,
            set_upstream: true,
        }
    }

    pub fn force_with_lease() -> Self {
        Self {
            force_with_lease: true,
            set_upstream: false,
        }
    }
}

/// Commits ahead of and behind a base ref.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: usize,
    pub behind: usize,
}

/// Git operations the workflows depend on.
pub trait Vcs {
    fn current_branch(&self) -> Result<String>;

    fn remote_url(&self) -> Result<String>;

    fn fetch(&self, branch: &str) -> Result<()>;

    /// Full diff for a ref range such as `origin/main...HEAD`.
    fn diff(&self, range: &str) -> Result<String>;

    fn diff_stat(&self, range: &str) -> Result<String>;

    /// Returns `false` when the rebase stopped on conflicts.
    fn rebase(&self, onto: &str) -> Result<bool>;

    /// Returns `false` when the merge stopped on conflicts.
    fn merge(&self, branch: &str) -> Result<bool>;

    /// Merge without committing to see whether `branch` applies cleanly.
    /// The working tree is restored before returning.
    fn trial_merge(&self, branch: &str) -> Result<Vec<String>>;

    fn abort_rebase(&self) -> Result<()>;

    fn abort_merge(&self) -> Result<()>;

    fn push(&self, branch: &str, options: PushOptions) -> Result<PushResult>;

    fn checkout(&self, branch: &str, create: bool, start_point: Option<&str>) -> Result<()>;

    /// Files with unresolved conflicts in the working tree.
    fn conflicted_files(&self) -> Result<Vec<String>>;

    /// `commit --amend --no-edit --allow-empty`, used to retrigger CI.
    fn amend_no_edit(&self) -> Result<()>;

    fn delete_branch(&self, branch: &str, remote: bool) -> Result<()>;

    fn commit_count(&self, range: &str) -> Result<usize>;

    fn branch_exists(&self, branch: &str) -> Result<bool>;

    fn is_branch_pushed(&self, branch: &str) -> Result<bool>;

    /// Ahead/behind counts of `branch` relative to `base`.
    fn ahead_behind(&self, branch: &str, base: &str) -> Result<AheadBehind> {
        Ok(AheadBehind {
            ahead: self.commit_count(&format!("{}..{}", base, branch))?,
            behind: self.commit_count(&format!("{}..{}", branch, base))?,
        })
    }
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    /// Check if current directory is a git repository
    pub fn is_git_repo() -> bool {
        Command::new("git")
            .args(["rev-parse", "--git-dir"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Top-level directory of the current repository.
    pub fn repo_root() -> Option<std::path::PathBuf> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().into())
    }

    fn run_raw(&self, args: &[&str]) -> Result<Output> {
        log::debug!("git {}", args.join(" "));
        Ok(Command::new("git").args(args).output()?)
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.run_raw(args)?;
        if !output.status.success() {
            return Err(AutoPrError::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn ref_exists(&self, refname: &str) -> Result<bool> {
        Ok(self
            .run_raw(&["show-ref", "--verify", "--quiet", refname])?
            .status
            .success())
    }
}

impl Vcs for GitCli {
    fn current_branch(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
    }

    fn remote_url(&self) -> Result<String> {
        Ok(self.run(&["remote", "get-url", "origin"])?.trim().to_string())
    }

    fn fetch(&self, branch: &str) -> Result<()> {
        self.run(&["fetch", "origin", branch])?;
        Ok(())
    }

    fn diff(&self, range: &str) -> Result<String> {
        self.run(&["diff", range])
    }

    fn diff_stat(&self, range: &str) -> Result<String> {
        self.run(&["diff", "--stat", range])
    }

    fn rebase(&self, onto: &str) -> Result<bool> {
        let output = self.run_raw(&["rebase", onto])?;
        if output.status.success() {
            return Ok(true);
        }
        if !self.conflicted_files()?.is_empty() {
            return Ok(false);
        }
        Err(AutoPrError::Git(format!(
            "Rebase onto '{}' failed: {}",
            onto,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn merge(&self, branch: &str) -> Result<bool> {
        let output = self.run_raw(&["merge", "--no-edit", branch])?;
        if output.status.success() {
            return Ok(true);
        }
        if !self.conflicted_files()?.is_empty() {
            return Ok(false);
        }
        Err(AutoPrError::Git(format!(
            "Merge of '{}' failed: {}",
            branch,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn trial_merge(&self, branch: &str) -> Result<Vec<String>> {
        let output = self.run_raw(&["merge", "--no-commit", "--no-ff", branch])?;
        let conflicts = if output.status.success() {
            Vec::new()
        } else {
            self.conflicted_files()?
        };
        // Always leave the tree as it was; a clean trial merge also needs undoing.
        if let Err(e) = self.abort_merge() {
            log::debug!("No merge to abort after trial: {}", e);
        }
        Ok(conflicts)
    }

    fn abort_rebase(&self) -> Result<()> {
        self.run(&["rebase", "--abort"])?;
        Ok(())
    }

    fn abort_merge(&self) -> Result<()> {
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    fn push(&self, branch: &str, options: PushOptions) -> Result<PushResult> {
        let mut args = vec!["push"];
        if options.force_with_lease {
            args.push("--force-with-lease");
        }
        if options.set_upstream {
            args.push("--set-upstream");
        }
        args.extend(["origin", branch]);

        let output = self.run_raw(&args)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        if output.status.success() {
            // git push reports this on stderr
            if stderr.contains("Everything up-to-date") {
                return Ok(PushResult::AlreadyUpToDate);
            }
            return Ok(PushResult::Success);
        }

        let error_msg = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        log::warn!("Push of '{}' failed: {}", branch, error_msg);
        Ok(PushResult::Error(error_msg))
    }

    fn checkout(&self, branch: &str, create: bool, start_point: Option<&str>) -> Result<()> {
        let mut args = vec!["checkout"];
        if create {
            args.push("-b");
        }
        args.push(branch);
        if let Some(start) = start_point {
            args.push(start);
        }
        let output = self.run_raw(&args)?;
        if !output.status.success() {
            let verb = if create { "create" } else { "checkout" };
            return Err(AutoPrError::Git(format!(
                "Failed to {} branch '{}': {}",
                verb,
                branch,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn conflicted_files(&self) -> Result<Vec<String>> {
        let stdout = self.run(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(parse_file_list(&stdout))
    }

    fn amend_no_edit(&self) -> Result<()> {
        self.run(&["commit", "--amend", "--no-edit", "--allow-empty"])?;
        Ok(())
    }

    fn delete_branch(&self, branch: &str, remote: bool) -> Result<()> {
        if remote {
            self.run(&["push", "origin", "--delete", branch])?;
        } else {
            self.run(&["branch", "-D", branch])?;
        }
        Ok(())
    }

    fn commit_count(&self, range: &str) -> Result<usize> {
        let stdout = self.run(&["rev-list", "--count", range])?;
        stdout
            .trim()
            .parse()
            .map_err(|_| AutoPrError::Git(format!("Unexpected rev-list output: {}", stdout.trim())))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        if self.ref_exists(&format!("refs/heads/{}", branch))? {
            return Ok(true);
        }
        self.ref_exists(&format!("refs/remotes/origin/{}", branch))
    }

    fn is_branch_pushed(&self, branch: &str) -> Result<bool> {
        self.ref_exists(&format!("refs/remotes/origin/{}", branch))
    }
}

fn parse_file_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_list_skips_blank_lines() {
        let files = parse_file_list("src/a.rs\n\n  src/b.rs \n");
        assert_eq!(files, vec!["src/a.rs".to_string(), "src/b.rs".to_string()]);
        assert!(parse_file_list("").is_empty());
    }

    #[test]
    fn test_push_options_presets() {
        assert!(PushOptions::upstream().set_upstream);
        assert!(!PushOptions::upstream().force_with_lease);
        assert!(PushOptions::force_with_lease().force_with_lease);
        assert_eq!(PushOptions::default(), PushOptions {
            force_with_lease: false,
            set_upstream: false
        });
    }

    // ========================================================================
    // PushResult enum tests
    // ========================================================================

    #[test]
    fn test_push_result_error_contains_message() {
        let msg = "permission denied".to_string();
        let result = PushResult::Error(msg.clone());
        assert_eq!(result, PushResult::Error(msg));
    }

    #[test]
    fn test_push_result_variants_are_distinct() {
        assert_ne!(PushResult::Success, PushResult::AlreadyUpToDate);
        assert_ne!(PushResult::Success, PushResult::Error("error".to_string()));
    }

    // ========================================================================
    // Default ahead/behind
    // ========================================================================

    struct CountingVcs;

    impl Vcs for CountingVcs {
        fn current_branch(&self) -> Result<String> {
            Ok("feature".into())
        }
        fn remote_url(&self) -> Result<String> {
            Ok(String::new())
        }
        fn fetch(&self, _: &str) -> Result<()> {
            Ok(())
        }
        fn diff(&self, _: &str) -> Result<String> {
            Ok(String::new())
        }
        fn diff_stat(&self, _: &str) -> Result<String> {
            Ok(String::new())
        }
        fn rebase(&self, _: &str) -> Result<bool> {
            Ok(true)
        }
        fn merge(&self, _: &str) -> Result<bool> {
            Ok(true)
        }
        fn trial_merge(&self, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn abort_rebase(&self) -> Result<()> {
            Ok(())
        }
        fn abort_merge(&self) -> Result<()> {
            Ok(())
        }
        fn push(&self, _: &str, _: PushOptions) -> Result<PushResult> {
            Ok(PushResult::Success)
        }
        fn checkout(&self, _: &str, _: bool, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        fn conflicted_files(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn amend_no_edit(&self) -> Result<()> {
            Ok(())
        }
        fn delete_branch(&self, _: &str, _: bool) -> Result<()> {
            Ok(())
        }
        fn commit_count(&self, range: &str) -> Result<usize> {
            Ok(if range.starts_with("origin/main..") { 3 } else { 1 })
        }
        fn branch_exists(&self, _: &str) -> Result<bool> {
            Ok(true)
        }
        fn is_branch_pushed(&self, _: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_ahead_behind_uses_both_ranges() {
        let counts = CountingVcs.ahead_behind("feature", "origin/main").unwrap();
        assert_eq!(counts, AheadBehind { ahead: 3, behind: 1 });
    }
}
