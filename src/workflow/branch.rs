//! Feature branch creation and branch status.

use super::WorkflowContext;
use crate::error::{AutoPrError, Result};
use crate::git::{PushOptions, PushResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateBranchOptions {
    pub name: String,
    /// Defaults to the repository's default branch.
    pub base: Option<String>,
    /// Push with upstream tracking after creating.
    pub push: bool,
}

/// A branch created by [`create_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBranch {
    pub name: String,
    pub base: String,
    pub pushed: bool,
}

/// The current branch relative to a base branch on `origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStatus {
    pub current: String,
    pub base: String,
    pub ahead: usize,
    pub behind: usize,
    pub pushed: bool,
}

impl BranchStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.behind == 0
    }

    pub fn has_changes(&self) -> bool {
        self.ahead > 0
    }
}

fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('-')
        || name.ends_with('/')
        || name.ends_with(".lock")
        || name.contains("..")
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\'));
    if invalid {
        return Err(AutoPrError::Git(format!("Invalid branch name: '{}'", name)));
    }
    Ok(())
}

pub(crate) fn resolve_base(ctx: &WorkflowContext, base: Option<&str>) -> Result<String> {
    match base {
        Some(b) => Ok(b.to_string()),
        None => ctx.platform.get_default_branch(),
    }
}

/// Create `name` from `origin/<base>` and check it out.
pub fn create_branch(ctx: &WorkflowContext, options: &CreateBranchOptions) -> Result<CreatedBranch> {
    validate_branch_name(&options.name)?;
    if ctx.vcs.branch_exists(&options.name)? {
        return Err(AutoPrError::Git(format!(
            "Branch '{}' already exists",
            options.name
        )));
    }

    let base = resolve_base(ctx, options.base.as_deref())?;
    ctx.step(&format!("Fetching {}...", base));
    ctx.vcs.fetch(&base)?;
    ctx.vcs
        .checkout(&options.name, true, Some(&format!("origin/{}", base)))?;

    let mut pushed = false;
    if options.push {
        ctx.step(&format!("Pushing branch '{}'...", options.name));
        match ctx.vcs.push(&options.name, PushOptions::upstream())? {
            PushResult::Success | PushResult::AlreadyUpToDate => pushed = true,
            PushResult::Error(message) => {
                return Err(AutoPrError::Git(format!(
                    "Created '{}' but failed to push it: {}",
                    options.name, message
                )))
            }
        }
    }

    Ok(CreatedBranch {
        name: options.name.clone(),
        base,
        pushed,
    })
}

/// Ahead/behind counts of the current branch against `origin/<base>`.
pub fn branch_status(ctx: &WorkflowContext, base: &str) -> Result<BranchStatus> {
    let current = ctx.vcs.current_branch()?;
    if let Err(e) = ctx.vcs.fetch(base) {
        log::warn!("Failed to fetch {}: {}", base, e);
    }
    let counts = ctx.vcs.ahead_behind("HEAD", &format!("origin/{}", base))?;
    Ok(BranchStatus {
        pushed: ctx.vcs.is_branch_pushed(&current)?,
        current,
        base: base.to_string(),
        ahead: counts.ahead,
        behind: counts.behind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePlatform, FakeVcs, Harness};

    fn harness() -> Harness {
        let mut h = Harness::new(FakePlatform::new(vec![]));
        h.vcs = FakeVcs::on_branch("main");
        h
    }

    #[test]
    fn test_branch_name_validation() {
        assert!(validate_branch_name("feature/retry-ci").is_ok());
        assert!(validate_branch_name("fix-123").is_ok());
        for bad in ["", "-x", "a b", "a..b", "feat/", "x.lock", "a:b", "wip*"] {
            assert!(validate_branch_name(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_create_branch_from_default_base() {
        let h = harness();
        let options = CreateBranchOptions {
            name: "feature/retry".into(),
            ..Default::default()
        };

        let created = create_branch(&h.ctx(), &options).unwrap();

        assert_eq!(created.base, "main");
        assert!(!created.pushed);
        assert!(h.platform.called("get_default_branch"));
        let calls = h.vcs.calls.borrow();
        assert_eq!(calls[0], "fetch main");
        assert_eq!(calls[1], "checkout -b feature/retry origin/main");
    }

    #[test]
    fn test_create_branch_with_base_and_push() {
        let h = harness();
        let options = CreateBranchOptions {
            name: "hotfix".into(),
            base: Some("release".into()),
            push: true,
        };

        let created = create_branch(&h.ctx(), &options).unwrap();

        assert!(created.pushed);
        assert!(!h.platform.called("get_default_branch"));
        assert!(h.vcs.called("checkout -b hotfix origin/release"));
        assert!(h.vcs.called("push hotfix --set-upstream"));
    }

    #[test]
    fn test_existing_branch_is_rejected() {
        let h = harness();
        let options = CreateBranchOptions {
            name: "main".into(),
            ..Default::default()
        };

        let err = create_branch(&h.ctx(), &options).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert!(!h.vcs.called("checkout"));
    }

    #[test]
    fn test_push_failure_is_reported() {
        let h = harness();
        *h.vcs.push_result.borrow_mut() = PushResult::Error("permission denied".into());
        let options = CreateBranchOptions {
            name: "feature/x".into(),
            push: true,
            ..Default::default()
        };

        let err = create_branch(&h.ctx(), &options).unwrap_err();

        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_branch_status_counts() {
        let h = Harness::new(FakePlatform::new(vec![]));
        h.vcs.commits_behind.set(4);
        h.vcs.pushed.set(false);

        let status = branch_status(&h.ctx(), "main").unwrap();

        assert_eq!(status.current, "feature");
        assert_eq!(status.ahead, 2);
        assert_eq!(status.behind, 4);
        assert!(!status.pushed);
        assert!(status.has_changes());
        assert!(!status.is_up_to_date());
    }
}
