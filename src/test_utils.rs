//! In-memory collaborators for workflow tests.
//!
//! Every fake records the calls it receives so tests can assert on what a
//! workflow did (or, more often, did not do) without touching git, the
//! network or the terminal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{AutoPrError, Result};
use crate::git::{PushOptions, PushResult, Vcs};
use crate::llm::{LanguageModel, LlmError, LlmRequest};
use crate::platform::{
    CheckResult, ListFilter, MergeRequest, NewPullRequest, Platform, PrState, PullRequestFacts,
    PullRequestUpdate, RepoInfo, ReviewResult,
};
use crate::prompt::Prompter;
use crate::workflow::{Clock, WorkflowContext};

// ============================================================================
// Platform
// ============================================================================

/// Platform that replays a queue of fact snapshots.
///
/// Each `get_pr` consumes one snapshot; the last one repeats forever.
/// `get_checks` and `get_reviews` read the snapshot at the head of the queue.
pub struct FakePlatform {
    snapshots: RefCell<VecDeque<PullRequestFacts>>,
    open_prs: RefCell<Vec<PullRequestFacts>>,
    pub calls: RefCell<Vec<String>>,
    pub created: RefCell<Vec<NewPullRequest>>,
    pub updates: RefCell<Vec<(u64, PullRequestUpdate)>>,
    pub merges: RefCell<Vec<(u64, MergeRequest)>>,
    pub merge_result: Cell<bool>,
    pub default_branch: String,
}

impl FakePlatform {
    pub fn new(snapshots: Vec<PullRequestFacts>) -> Self {
        Self {
            snapshots: RefCell::new(snapshots.into()),
            open_prs: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            created: RefCell::new(Vec::new()),
            updates: RefCell::new(Vec::new()),
            merges: RefCell::new(Vec::new()),
            merge_result: Cell::new(true),
            default_branch: "main".to_string(),
        }
    }

    pub fn single(facts: PullRequestFacts) -> Self {
        Self::new(vec![facts])
    }

    /// Open PRs returned by `list_prs`.
    pub fn with_open_prs(self, prs: Vec<PullRequestFacts>) -> Self {
        *self.open_prs.borrow_mut() = prs;
        self
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == name)
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.borrow_mut().push(name.to_string());
    }

    fn current(&self, number: u64) -> Result<PullRequestFacts> {
        self.snapshots
            .borrow()
            .front()
            .cloned()
            .ok_or(AutoPrError::PrNotFound(number))
    }

    fn next_snapshot(&self, number: u64) -> Result<PullRequestFacts> {
        let mut snapshots = self.snapshots.borrow_mut();
        let facts = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        facts.ok_or(AutoPrError::PrNotFound(number))
    }
}

impl Platform for FakePlatform {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn get_pr(&self, number: u64) -> Result<PullRequestFacts> {
        self.record("get_pr");
        self.next_snapshot(number)
    }

    fn create_pr(&self, request: &NewPullRequest) -> Result<PullRequestFacts> {
        self.record("create_pr");
        self.created.borrow_mut().push(request.clone());
        let mut facts = PullRequestFacts::open(42, request.head.as_str(), request.base.as_str());
        facts.title = request.title.clone();
        facts.body = request.body.clone();
        facts.is_draft = request.draft;
        facts.url = "https://github.com/acme/widgets/pull/42".to_string();
        Ok(facts)
    }

    fn update_pr(&self, number: u64, update: &PullRequestUpdate) -> Result<PullRequestFacts> {
        self.record("update_pr");
        self.updates.borrow_mut().push((number, update.clone()));
        let mut facts = self.current(number)?;
        if let Some(title) = &update.title {
            facts.title = title.clone();
        }
        if let Some(body) = &update.body {
            facts.body = body.clone();
        }
        Ok(facts)
    }

    fn merge_pr(&self, number: u64, request: &MergeRequest) -> Result<bool> {
        self.record("merge_pr");
        self.merges.borrow_mut().push((number, request.clone()));
        Ok(self.merge_result.get())
    }

    fn get_checks(&self, number: u64) -> Result<Vec<CheckResult>> {
        self.record("get_checks");
        Ok(self.current(number)?.checks)
    }

    fn get_reviews(&self, number: u64) -> Result<Vec<ReviewResult>> {
        self.record("get_reviews");
        Ok(self.current(number)?.reviews)
    }

    fn request_reviewers(&self, _number: u64, _reviewers: &[String]) -> Result<()> {
        self.record("request_reviewers");
        Ok(())
    }

    fn add_labels(&self, _number: u64, _labels: &[String]) -> Result<()> {
        self.record("add_labels");
        Ok(())
    }

    fn get_default_branch(&self) -> Result<String> {
        self.record("get_default_branch");
        Ok(self.default_branch.clone())
    }

    fn list_prs(&self, filter: &ListFilter) -> Result<Vec<PullRequestFacts>> {
        self.record("list_prs");
        Ok(self
            .open_prs
            .borrow()
            .iter()
            .filter(|pr| pr.state != PrState::Merged)
            .filter(|pr| filter.head.as_deref().map_or(true, |h| pr.head_branch == h))
            .filter(|pr| filter.base.as_deref().map_or(true, |b| pr.base_branch == b))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    fn get_repo_info(&self) -> Result<RepoInfo> {
        Ok(RepoInfo {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            url: "https://github.com/acme/widgets".to_string(),
        })
    }
}

// ============================================================================
// VCS
// ============================================================================

/// Git stand-in with scripted answers.
pub struct FakeVcs {
    pub branch: String,
    pub calls: RefCell<Vec<String>>,
    /// Result of `rebase`/`merge`: true applies cleanly.
    pub sync_succeeds: Cell<bool>,
    /// Files reported by `trial_merge` and `conflicted_files`.
    pub conflicts: RefCell<Vec<String>>,
    pub push_result: RefCell<PushResult>,
    pub commits_ahead: Cell<usize>,
    pub commits_behind: Cell<usize>,
    pub pushed: Cell<bool>,
    pub existing_branches: RefCell<Vec<String>>,
    pub diff_text: String,
}

impl FakeVcs {
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            calls: RefCell::new(Vec::new()),
            sync_succeeds: Cell::new(true),
            conflicts: RefCell::new(Vec::new()),
            push_result: RefCell::new(PushResult::Success),
            commits_ahead: Cell::new(2),
            commits_behind: Cell::new(0),
            pushed: Cell::new(true),
            existing_branches: RefCell::new(vec!["main".to_string()]),
            diff_text: "+fn retry() {}\n".to_string(),
        }
    }

    pub fn with_conflicts(self, files: &[&str]) -> Self {
        *self.conflicts.borrow_mut() = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn remote_url(&self) -> Result<String> {
        Ok("git@github.com:acme/widgets.git".to_string())
    }

    fn fetch(&self, branch: &str) -> Result<()> {
        self.record(format!("fetch {}", branch));
        Ok(())
    }

    fn diff(&self, range: &str) -> Result<String> {
        self.record(format!("diff {}", range));
        Ok(self.diff_text.clone())
    }

    fn diff_stat(&self, range: &str) -> Result<String> {
        self.record(format!("diff_stat {}", range));
        Ok(" src/lib.rs | 1 +\n".to_string())
    }

    fn rebase(&self, onto: &str) -> Result<bool> {
        self.record(format!("rebase {}", onto));
        Ok(self.sync_succeeds.get())
    }

    fn merge(&self, branch: &str) -> Result<bool> {
        self.record(format!("merge {}", branch));
        Ok(self.sync_succeeds.get())
    }

    fn trial_merge(&self, branch: &str) -> Result<Vec<String>> {
        self.record(format!("trial_merge {}", branch));
        Ok(self.conflicts.borrow().clone())
    }

    fn abort_rebase(&self) -> Result<()> {
        self.record("abort_rebase".to_string());
        Ok(())
    }

    fn abort_merge(&self) -> Result<()> {
        self.record("abort_merge".to_string());
        Ok(())
    }

    fn push(&self, branch: &str, options: PushOptions) -> Result<PushResult> {
        let flag = if options.force_with_lease {
            " --force-with-lease"
        } else if options.set_upstream {
            " --set-upstream"
        } else {
            ""
        };
        self.record(format!("push {}{}", branch, flag));
        Ok(self.push_result.borrow().clone())
    }

    fn checkout(&self, branch: &str, create: bool, start_point: Option<&str>) -> Result<()> {
        let call = match (create, start_point) {
            (true, Some(start)) => format!("checkout -b {} {}", branch, start),
            (true, None) => format!("checkout -b {}", branch),
            _ => format!("checkout {}", branch),
        };
        self.record(call);
        Ok(())
    }

    fn conflicted_files(&self) -> Result<Vec<String>> {
        Ok(self.conflicts.borrow().clone())
    }

    fn amend_no_edit(&self) -> Result<()> {
        self.record("amend".to_string());
        Ok(())
    }

    fn delete_branch(&self, branch: &str, remote: bool) -> Result<()> {
        let scope = if remote { "remote" } else { "local" };
        self.record(format!("delete_branch {} {}", scope, branch));
        Ok(())
    }

    fn commit_count(&self, range: &str) -> Result<usize> {
        // `base..head` counts ahead, `head..base` counts behind.
        let behind = range
            .split_once("..")
            .map(|(_, to)| to.contains("origin/") || to == "main")
            .unwrap_or(false);
        Ok(if behind {
            self.commits_behind.get()
        } else {
            self.commits_ahead.get()
        })
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        Ok(self.existing_branches.borrow().iter().any(|b| b == branch))
    }

    fn is_branch_pushed(&self, _branch: &str) -> Result<bool> {
        Ok(self.pushed.get())
    }
}

// ============================================================================
// LLM
// ============================================================================

/// Model that returns canned responses in order, repeating the last.
pub struct FakeLlm {
    responses: RefCell<VecDeque<std::result::Result<String, LlmError>>>,
    pub requests: RefCell<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub fn replying(text: &str) -> Self {
        Self::scripted(vec![Ok(text.to_string())])
    }

    pub fn scripted(responses: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl LanguageModel for FakeLlm {
    fn complete(&self, request: &LlmRequest) -> std::result::Result<String, LlmError> {
        self.requests.borrow_mut().push(request.clone());
        let mut responses = self.responses.borrow_mut();
        if responses.len() > 1 {
            if let Some(next) = responses.pop_front() {
                return next;
            }
        }
        match responses.front() {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(LlmError::Failed(e.to_string())),
            None => Err(LlmError::Failed("no scripted response".to_string())),
        }
    }
}

// ============================================================================
// Prompter and clock
// ============================================================================

/// Answers questions from queues; falls back to the default when empty.
pub struct ScriptedPrompter {
    interactive: bool,
    confirms: RefCell<VecDeque<bool>>,
    selections: RefCell<VecDeque<usize>>,
    /// Every question asked, with the options offered for selections.
    pub asked: RefCell<Vec<(String, Vec<String>, usize)>>,
}

impl ScriptedPrompter {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            confirms: RefCell::new(VecDeque::new()),
            selections: RefCell::new(VecDeque::new()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            ..Self::interactive()
        }
    }

    pub fn confirming(self, answers: &[bool]) -> Self {
        self.confirms.borrow_mut().extend(answers.iter().copied());
        self
    }

    pub fn selecting(self, answers: &[usize]) -> Self {
        self.selections.borrow_mut().extend(answers.iter().copied());
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        self.asked
            .borrow_mut()
            .push((question.to_string(), Vec::new(), usize::from(default)));
        if !self.interactive {
            return default;
        }
        self.confirms.borrow_mut().pop_front().unwrap_or(default)
    }

    fn select(&self, question: &str, options: &[&str], default: usize) -> usize {
        self.asked.borrow_mut().push((
            question.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
            default,
        ));
        if !self.interactive {
            return default;
        }
        self.selections.borrow_mut().pop_front().unwrap_or(default)
    }
}

/// Clock whose `sleep` only advances its own notion of time.
pub struct ManualClock {
    start: Instant,
    offset: Cell<Duration>,
    pub sleeps: Cell<u32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Owns one of each fake and lends them out as a [`WorkflowContext`].
pub struct Harness {
    pub config: Config,
    pub platform: FakePlatform,
    pub vcs: FakeVcs,
    pub llm: FakeLlm,
    pub prompter: ScriptedPrompter,
    pub clock: ManualClock,
}

impl Harness {
    /// Non-interactive, on the PR's head branch, with a model that answers
    /// with a two-line message.
    pub fn new(platform: FakePlatform) -> Self {
        Self {
            config: Config::default(),
            platform,
            vcs: FakeVcs::on_branch("feature"),
            llm: FakeLlm::replying("feat: add retry support\n\nRetries flaky network calls."),
            prompter: ScriptedPrompter::non_interactive(),
            clock: ManualClock::new(),
        }
    }

    pub fn ctx(&self) -> WorkflowContext<'_> {
        WorkflowContext {
            config: &self.config,
            platform: &self.platform,
            vcs: &self.vcs,
            llm: &self.llm,
            prompter: &self.prompter,
            clock: &self.clock,
            quiet: true,
        }
    }
}
