//! GitHub backend driven through the `gh` CLI.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::process::{Command, Output};

use super::types::*;
use super::Platform;
use crate::error::{AutoPrError, Result};

/// Fields requested from `gh pr view` / `gh pr list`.
const PR_JSON_FIELDS: &str = "number,title,body,state,headRefName,baseRefName,url,mergeable,mergeStateStatus,isDraft,statusCheckRollup,reviews,labels,author,createdAt,updatedAt";

/// What a failing `gh` invocation was trying to do, for error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GhOp {
    Read(u64),
    Merge(u64),
    Other,
}

#[derive(Debug, Default)]
pub struct GhCli;

impl GhCli {
    pub fn new() -> Self {
        Self
    }

    pub fn is_installed() -> bool {
        Command::new("gh")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn is_authenticated() -> bool {
        Command::new("gh")
            .args(["auth", "status"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str], op: GhOp) -> Result<String> {
        log::debug!("gh {}", args.join(" "));
        let output: Output = Command::new("gh").args(args).output().map_err(|e| {
            AutoPrError::PlatformUnavailable(format!("Failed to run gh: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_error(stderr.trim(), op));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Map `gh` stderr onto an error kind.
fn classify_error(stderr: &str, op: GhOp) -> AutoPrError {
    let lower = stderr.to_lowercase();

    if lower.contains("not authenticated")
        || lower.contains("authentication")
        || lower.contains("gh auth login")
    {
        return AutoPrError::Authentication {
            platform: "github".to_string(),
            message: stderr.to_string(),
        };
    }

    if let GhOp::Read(number) | GhOp::Merge(number) = op {
        if lower.contains("could not find") || lower.contains("not found") {
            return AutoPrError::PrNotFound(number);
        }
    }

    if let GhOp::Merge(number) = op {
        if lower.contains("conflict") {
            return AutoPrError::MergeConflict {
                pr_number: number,
                files: Vec::new(),
            };
        }
        if lower.contains("blocked") || lower.contains("cannot") || lower.contains("not mergeable") {
            return AutoPrError::PrBlocked {
                pr_number: number,
                reasons: vec![stderr.to_string()],
            };
        }
    }

    if lower.contains("could not resolve host")
        || lower.contains("connection")
        || lower.contains("timeout")
        || lower.contains("rate limit")
    {
        return AutoPrError::PlatformUnavailable(stderr.to_string());
    }

    AutoPrError::Platform(stderr.to_string())
}

// ============================================================================
// JSON shapes returned by `gh`
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    state: String,
    #[serde(default)]
    head_ref_name: String,
    #[serde(default)]
    base_ref_name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    mergeable: Option<serde_json::Value>,
    #[serde(default)]
    merge_state_status: Option<String>,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    status_check_rollup: Option<Vec<GhCheck>>,
    #[serde(default)]
    reviews: Option<Vec<GhReview>>,
    #[serde(default)]
    labels: Option<Vec<GhLabel>>,
    #[serde(default)]
    author: Option<GhUser>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Either a CheckRun (`name`/`status`/`conclusion`) or a StatusContext
/// (`context`/`state`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhCheck {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    details_url: Option<String>,
    #[serde(default)]
    target_url: Option<String>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhReview {
    #[serde(default)]
    author: Option<GhUser>,
    state: String,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

impl GhCheck {
    fn into_check(self) -> CheckResult {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .or(self.context)
            .unwrap_or_else(|| "unknown".to_string());

        let (status, conclusion) = match (&self.status, &self.state) {
            (Some(status), _) => {
                let status = CheckStatus::parse(status).unwrap_or(CheckStatus::Queued);
                let conclusion = self
                    .conclusion
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .and_then(CheckConclusion::parse);
                (status, conclusion)
            }
            // Commit status contexts only carry a combined state.
            (None, Some(state)) => match state.to_ascii_uppercase().as_str() {
                "SUCCESS" => (CheckStatus::Completed, Some(CheckConclusion::Success)),
                "FAILURE" | "ERROR" => (CheckStatus::Completed, Some(CheckConclusion::Failure)),
                _ => (CheckStatus::InProgress, None),
            },
            (None, None) => (CheckStatus::Queued, None),
        };

        CheckResult {
            name,
            status,
            conclusion,
            url: self.details_url.or(self.target_url),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

impl GhReview {
    fn into_review(self) -> Option<ReviewResult> {
        Some(ReviewResult {
            user: self.author.map(|a| a.login).unwrap_or_default(),
            state: ReviewState::parse(&self.state)?,
            submitted_at: self.submitted_at,
        })
    }
}

/// `mergeable` is `"MERGEABLE"`/`"CONFLICTING"`/`"UNKNOWN"`, or a bool on older `gh`.
fn parse_mergeable(value: Option<&serde_json::Value>) -> Option<bool> {
    match value? {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.to_ascii_uppercase().as_str() {
            "MERGEABLE" => Some(true),
            "CONFLICTING" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_merge_state(status: Option<&str>, mergeable: Option<&serde_json::Value>) -> Option<MergeableState> {
    let from_status = status.and_then(MergeableState::parse);
    let conflicting = matches!(
        mergeable,
        Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("CONFLICTING")
    );
    match from_status {
        Some(MergeableState::Unknown) | None if conflicting => Some(MergeableState::Conflicting),
        other => other,
    }
}

impl GhPullRequest {
    fn into_facts(self) -> Result<PullRequestFacts> {
        let state = PrState::parse(&self.state)
            .ok_or_else(|| AutoPrError::Platform(format!("Unknown PR state '{}'", self.state)))?;

        let reviews = self
            .reviews
            .unwrap_or_default()
            .into_iter()
            .filter_map(GhReview::into_review)
            .collect();

        Ok(PullRequestFacts {
            number: self.number,
            title: self.title,
            body: self.body,
            state,
            is_draft: self.is_draft,
            base_branch: self.base_ref_name,
            head_branch: self.head_ref_name,
            url: self.url,
            author: self.author.map(|a| a.login),
            mergeable: parse_mergeable(self.mergeable.as_ref()),
            mergeable_state: parse_merge_state(
                self.merge_state_status.as_deref(),
                self.mergeable.as_ref(),
            ),
            checks: self
                .status_check_rollup
                .unwrap_or_default()
                .into_iter()
                .map(GhCheck::into_check)
                .collect(),
            reviews: latest_reviews(reviews),
            labels: self
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Parse the output of `gh pr view --json ...`.
pub fn parse_pr_view(json: &str) -> Result<PullRequestFacts> {
    let pr: GhPullRequest = serde_json::from_str(json)?;
    pr.into_facts()
}

/// Parse the output of `gh pr list --json ...`.
pub fn parse_pr_list(json: &str) -> Result<Vec<PullRequestFacts>> {
    let prs: Vec<GhPullRequest> = serde_json::from_str(json)?;
    prs.into_iter().map(GhPullRequest::into_facts).collect()
}

/// PR number from the URL printed by `gh pr create`.
pub fn pr_number_from_url(url: &str) -> Option<u64> {
    url.trim().trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

impl Platform for GhCli {
    fn name(&self) -> &'static str {
        "github-cli"
    }

    fn is_available(&self) -> bool {
        Self::is_installed() && Self::is_authenticated()
    }

    fn get_pr(&self, number: u64) -> Result<PullRequestFacts> {
        let n = number.to_string();
        let stdout = self.run(
            &["pr", "view", &n, "--json", PR_JSON_FIELDS],
            GhOp::Read(number),
        )?;
        parse_pr_view(&stdout)
    }

    fn create_pr(&self, request: &NewPullRequest) -> Result<PullRequestFacts> {
        let mut args = vec![
            "pr",
            "create",
            "--title",
            &request.title,
            "--body",
            &request.body,
            "--head",
            &request.head,
            "--base",
            &request.base,
        ];
        if request.draft {
            args.push("--draft");
        }
        let reviewers = request.reviewers.join(",");
        if !request.reviewers.is_empty() {
            args.extend(["--reviewer", &reviewers]);
        }
        let labels = request.labels.join(",");
        if !request.labels.is_empty() {
            args.extend(["--label", &labels]);
        }

        let stdout = self.run(&args, GhOp::Other)?;
        let url = stdout.lines().last().unwrap_or_default();
        let number = pr_number_from_url(url).ok_or_else(|| {
            AutoPrError::Platform(format!("Could not parse PR number from '{}'", url))
        })?;
        self.get_pr(number)
    }

    fn update_pr(&self, number: u64, update: &PullRequestUpdate) -> Result<PullRequestFacts> {
        let n = number.to_string();

        if update.title.is_some() || update.body.is_some() {
            let mut args = vec!["pr", "edit", n.as_str()];
            if let Some(title) = &update.title {
                args.extend(["--title", title.as_str()]);
            }
            if let Some(body) = &update.body {
                args.extend(["--body", body.as_str()]);
            }
            self.run(&args, GhOp::Read(number))?;
        }

        match update.draft {
            Some(true) => {
                self.run(&["pr", "ready", &n, "--undo"], GhOp::Read(number))?;
            }
            Some(false) => {
                self.run(&["pr", "ready", &n], GhOp::Read(number))?;
            }
            None => {}
        }

        match update.state {
            Some(PrState::Closed) => {
                self.run(&["pr", "close", &n], GhOp::Read(number))?;
            }
            Some(PrState::Open) => {
                self.run(&["pr", "reopen", &n], GhOp::Read(number))?;
            }
            Some(other) => {
                log::warn!("Ignoring unsupported state change to '{}'", other);
            }
            None => {}
        }

        self.get_pr(number)
    }

    fn merge_pr(&self, number: u64, request: &MergeRequest) -> Result<bool> {
        let n = number.to_string();
        let method = format!("--{}", request.method.as_str());
        let mut args = vec!["pr", "merge", n.as_str(), method.as_str()];
        if let Some(subject) = &request.commit_title {
            args.extend(["--subject", subject.as_str()]);
        }
        if let Some(body) = &request.commit_message {
            args.extend(["--body", body.as_str()]);
        }
        if request.delete_branch {
            args.push("--delete-branch");
        }
        self.run(&args, GhOp::Merge(number))?;
        Ok(true)
    }

    fn get_checks(&self, number: u64) -> Result<Vec<CheckResult>> {
        let stdout = self.run(
            &["pr", "view", &number.to_string(), "--json", "statusCheckRollup"],
            GhOp::Read(number),
        )?;
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Rollup {
            #[serde(default)]
            status_check_rollup: Option<Vec<GhCheck>>,
        }
        let rollup: Rollup = serde_json::from_str(&stdout)?;
        Ok(rollup
            .status_check_rollup
            .unwrap_or_default()
            .into_iter()
            .map(GhCheck::into_check)
            .collect())
    }

    fn get_reviews(&self, number: u64) -> Result<Vec<ReviewResult>> {
        let stdout = self.run(
            &["pr", "view", &number.to_string(), "--json", "reviews"],
            GhOp::Read(number),
        )?;
        #[derive(Deserialize)]
        struct Reviews {
            #[serde(default)]
            reviews: Option<Vec<GhReview>>,
        }
        let parsed: Reviews = serde_json::from_str(&stdout)?;
        Ok(latest_reviews(
            parsed
                .reviews
                .unwrap_or_default()
                .into_iter()
                .filter_map(GhReview::into_review)
                .collect(),
        ))
    }

    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        let joined = reviewers.join(",");
        self.run(
            &["pr", "edit", &number.to_string(), "--add-reviewer", &joined],
            GhOp::Read(number),
        )?;
        Ok(())
    }

    fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let joined = labels.join(",");
        self.run(
            &["pr", "edit", &number.to_string(), "--add-label", &joined],
            GhOp::Read(number),
        )?;
        Ok(())
    }

    fn get_default_branch(&self) -> Result<String> {
        let stdout = self.run(&["repo", "view", "--json", "defaultBranchRef"], GhOp::Other)?;
        let parsed: serde_json::Value = serde_json::from_str(&stdout)?;
        Ok(parsed
            .get("defaultBranchRef")
            .and_then(|v| v.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("main")
            .to_string())
    }

    fn list_prs(&self, filter: &ListFilter) -> Result<Vec<PullRequestFacts>> {
        let limit = filter.limit.to_string();
        let mut args = vec![
            "pr",
            "list",
            "--state",
            filter.state.as_str(),
            "--limit",
            limit.as_str(),
        ];
        if let Some(head) = &filter.head {
            args.extend(["--head", head.as_str()]);
        }
        if let Some(base) = &filter.base {
            args.extend(["--base", base.as_str()]);
        }
        args.extend(["--json", PR_JSON_FIELDS]);
        let stdout = self.run(&args, GhOp::Other)?;
        if stdout.is_empty() {
            return Ok(Vec::new());
        }
        parse_pr_list(&stdout)
    }

    fn get_repo_info(&self) -> Result<RepoInfo> {
        let stdout = self.run(&["repo", "view", "--json", "owner,name,url"], GhOp::Other)?;
        let parsed: serde_json::Value = serde_json::from_str(&stdout)?;
        let field = |v: Option<&serde_json::Value>| {
            v.and_then(|v| v.as_str()).unwrap_or_default().to_string()
        };
        Ok(RepoInfo {
            owner: field(parsed.get("owner").and_then(|o| o.get("login"))),
            repo: field(parsed.get("name")),
            url: field(parsed.get("url")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PR_VIEW: &str = r#"{
        "number": 42,
        "title": "Add widgets",
        "body": "Adds widgets.",
        "state": "OPEN",
        "headRefName": "feature/widgets",
        "baseRefName": "main",
        "url": "https://github.com/acme/widgets/pull/42",
        "mergeable": "CONFLICTING",
        "mergeStateStatus": "DIRTY",
        "isDraft": false,
        "statusCheckRollup": [
            {"__typename": "CheckRun", "name": "build", "status": "COMPLETED", "conclusion": "SUCCESS", "detailsUrl": "https://ci/1"},
            {"__typename": "CheckRun", "name": "e2e", "status": "IN_PROGRESS", "conclusion": ""},
            {"__typename": "StatusContext", "context": "ci/legacy", "state": "FAILURE", "targetUrl": "https://ci/2"}
        ],
        "reviews": [
            {"author": {"login": "alice"}, "state": "CHANGES_REQUESTED", "submittedAt": "2024-05-01T10:00:00Z"},
            {"author": {"login": "alice"}, "state": "APPROVED", "submittedAt": "2024-05-02T10:00:00Z"}
        ],
        "labels": [{"name": "enhancement"}],
        "author": {"login": "bob"},
        "createdAt": "2024-04-30T09:00:00Z",
        "updatedAt": "2024-05-02T10:00:00Z"
    }"#;

    #[test]
    fn test_parse_pr_view_maps_fields() {
        let facts = parse_pr_view(PR_VIEW).unwrap();
        assert_eq!(facts.number, 42);
        assert_eq!(facts.state, PrState::Open);
        assert_eq!(facts.head_branch, "feature/widgets");
        assert_eq!(facts.mergeable, Some(false));
        assert_eq!(facts.mergeable_state, Some(MergeableState::Dirty));
        assert!(facts.has_conflicts());
        assert_eq!(facts.author.as_deref(), Some("bob"));
        assert!(facts.labels.contains("enhancement"));
    }

    #[test]
    fn test_parse_pr_view_checks_and_status_contexts() {
        let facts = parse_pr_view(PR_VIEW).unwrap();
        assert_eq!(facts.checks.len(), 3);
        assert!(facts.checks[0].is_successful());
        assert_eq!(facts.checks[0].url.as_deref(), Some("https://ci/1"));
        assert!(facts.checks[1].is_pending());
        assert_eq!(facts.checks[1].conclusion, None);
        assert_eq!(facts.checks[2].name, "ci/legacy");
        assert!(facts.checks[2].is_failed());
    }

    #[test]
    fn test_parse_pr_view_keeps_latest_review() {
        let facts = parse_pr_view(PR_VIEW).unwrap();
        assert_eq!(facts.reviews.len(), 1);
        assert_eq!(facts.reviews[0].state, ReviewState::Approved);
    }

    #[test]
    fn test_parse_pr_view_minimal_payload() {
        let facts = parse_pr_view(r#"{"number": 1, "state": "MERGED"}"#).unwrap();
        assert!(facts.is_merged());
        assert!(facts.checks.is_empty());
        assert_eq!(facts.mergeable, None);
    }

    #[test]
    fn test_parse_pr_view_rejects_unknown_state() {
        assert!(parse_pr_view(r#"{"number": 1, "state": "LOCKED"}"#).is_err());
    }

    #[test]
    fn test_conflicting_without_merge_state_is_conflict() {
        let facts =
            parse_pr_view(r#"{"number": 1, "state": "OPEN", "mergeable": "CONFLICTING"}"#).unwrap();
        assert_eq!(facts.mergeable_state, Some(MergeableState::Conflicting));
    }

    #[test]
    fn test_boolean_mergeable() {
        let facts = parse_pr_view(r#"{"number": 1, "state": "OPEN", "mergeable": true}"#).unwrap();
        assert_eq!(facts.mergeable, Some(true));
    }

    #[test]
    fn test_parse_pr_list_empty_array() {
        assert!(parse_pr_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_pr_number_from_url() {
        assert_eq!(
            pr_number_from_url("https://github.com/acme/widgets/pull/17\n"),
            Some(17)
        );
        assert_eq!(pr_number_from_url("https://github.com/acme/widgets/pull/"), None);
    }

    // ========================================================================
    // Error classification
    // ========================================================================

    #[test]
    fn test_classify_auth_error() {
        let err = classify_error("To get started with GitHub CLI, please run: gh auth login", GhOp::Other);
        assert!(matches!(err, AutoPrError::Authentication { .. }));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_error("GraphQL: Could not resolve to a PullRequest (could not find)", GhOp::Read(5));
        assert!(matches!(err, AutoPrError::PrNotFound(5)));
    }

    #[test]
    fn test_classify_merge_conflict_and_blocked() {
        let err = classify_error("Pull request is not mergeable: merge conflict", GhOp::Merge(5));
        assert!(matches!(err, AutoPrError::MergeConflict { pr_number: 5, .. }));
        let err = classify_error("the base branch policy prohibits the merge; blocked", GhOp::Merge(5));
        assert!(matches!(err, AutoPrError::PrBlocked { pr_number: 5, .. }));
    }

    #[test]
    fn test_classify_network_and_generic() {
        assert!(matches!(
            classify_error("error connecting to api.github.com: connection refused", GhOp::Other),
            AutoPrError::PlatformUnavailable(_)
        ));
        assert!(matches!(
            classify_error("something odd", GhOp::Other),
            AutoPrError::Platform(_)
        ));
    }
}
