//! GitHub backend using the REST API and a personal access token.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::types::*;
use super::Platform;
use crate::error::{AutoPrError, Result};

const BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("auto-pr/", env!("CARGO_PKG_VERSION"));

pub struct GithubApi {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    base_url: String,
}

impl GithubApi {
    pub fn new(token: String, owner: String, repo: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            token,
            owner,
            repo,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point at a GitHub Enterprise API root instead of api.github.com.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, self.owner, self.repo, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn send(&self, builder: RequestBuilder, pr_number: Option<u64>) -> Result<Response> {
        let response = self.authed(builder).send().map_err(|e| {
            AutoPrError::PlatformUnavailable(format!("GitHub API request failed: {}", e))
        })?;
        let status = response.status();
        log::debug!("GitHub API {} {}", status.as_u16(), response.url());
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify_status(status, &body, pr_number))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, pr_number: Option<u64>) -> Result<T> {
        let response = self.send(self.client.get(self.repo_url(path)), pr_number)?;
        Ok(response.json()?)
    }

    fn fetch_pull(&self, number: u64) -> Result<ApiPullRequest> {
        self.get_json(&format!("/pulls/{}", number), Some(number))
    }

    fn checks_for_sha(&self, sha: &str) -> Result<Vec<CheckResult>> {
        let runs: ApiCheckRuns =
            self.get_json(&format!("/commits/{}/check-runs?per_page=100", sha), None)?;
        Ok(runs.check_runs.into_iter().map(ApiCheckRun::into_check).collect())
    }

    fn reviews_for(&self, number: u64) -> Result<Vec<ReviewResult>> {
        let reviews: Vec<ApiReview> =
            self.get_json(&format!("/pulls/{}/reviews?per_page=100", number), Some(number))?;
        Ok(latest_reviews(
            reviews.into_iter().filter_map(ApiReview::into_review).collect(),
        ))
    }

    fn facts_for(&self, pull: ApiPullRequest) -> Result<PullRequestFacts> {
        let checks = self.checks_for_sha(&pull.head.sha)?;
        let reviews = self.reviews_for(pull.number)?;
        Ok(facts_from_api(pull, checks, reviews))
    }

    fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        let url = self.repo_url(&format!("/git/refs/heads/{}", branch));
        self.send(self.client.delete(url), None)?;
        Ok(())
    }
}

/// Map an HTTP error status onto an error kind.
fn classify_status(status: StatusCode, body: &str, pr_number: Option<u64>) -> AutoPrError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match (status.as_u16(), pr_number) {
        (401, _) => AutoPrError::Authentication {
            platform: "github".to_string(),
            message,
        },
        (403, _) if message.to_lowercase().contains("rate limit") => {
            AutoPrError::PlatformUnavailable(message)
        }
        (403, _) => AutoPrError::Authentication {
            platform: "github".to_string(),
            message,
        },
        (404, Some(number)) => AutoPrError::PrNotFound(number),
        (405, Some(number)) => AutoPrError::PrBlocked {
            pr_number: number,
            reasons: vec![message],
        },
        (409, Some(number)) => AutoPrError::MergeConflict {
            pr_number: number,
            files: Vec::new(),
        },
        (429, _) => AutoPrError::PlatformUnavailable(message),
        (code, _) if code >= 500 => AutoPrError::PlatformUnavailable(format!("{}: {}", code, message)),
        (code, _) => AutoPrError::Platform(format!("{}: {}", code, message)),
    }
}

// ============================================================================
// REST payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    name: String,
    #[serde(default)]
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    draft: bool,
    head: ApiRef,
    base: ApiRef,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    mergeable: Option<bool>,
    #[serde(default)]
    mergeable_state: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRuns {
    #[serde(default)]
    check_runs: Vec<ApiCheckRun>,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRun {
    name: String,
    status: String,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl ApiCheckRun {
    fn into_check(self) -> CheckResult {
        CheckResult {
            name: self.name,
            status: CheckStatus::parse(&self.status).unwrap_or(CheckStatus::Queued),
            conclusion: self.conclusion.as_deref().and_then(CheckConclusion::parse),
            url: self.html_url,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiReview {
    #[serde(default)]
    user: Option<ApiUser>,
    state: String,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

impl ApiReview {
    fn into_review(self) -> Option<ReviewResult> {
        Some(ReviewResult {
            user: self.user.map(|u| u.login).unwrap_or_default(),
            state: ReviewState::parse(&self.state)?,
            submitted_at: self.submitted_at,
        })
    }
}

fn facts_from_api(
    pull: ApiPullRequest,
    checks: Vec<CheckResult>,
    reviews: Vec<ReviewResult>,
) -> PullRequestFacts {
    let state = if pull.merged {
        PrState::Merged
    } else {
        PrState::parse(&pull.state).unwrap_or(PrState::Open)
    };
    PullRequestFacts {
        number: pull.number,
        title: pull.title,
        body: pull.body.unwrap_or_default(),
        state,
        is_draft: pull.draft,
        base_branch: pull.base.name,
        head_branch: pull.head.name,
        url: pull.html_url,
        author: pull.user.map(|u| u.login),
        mergeable: pull.mergeable,
        mergeable_state: pull.mergeable_state.as_deref().and_then(MergeableState::parse),
        checks,
        reviews,
        labels: pull.labels.into_iter().map(|l| l.name).collect(),
        created_at: pull.created_at,
        updated_at: pull.updated_at,
    }
}

impl Platform for GithubApi {
    fn name(&self) -> &'static str {
        "github-api"
    }

    fn is_available(&self) -> bool {
        self.send(self.client.get(self.repo_url("")), None).is_ok()
    }

    fn get_pr(&self, number: u64) -> Result<PullRequestFacts> {
        let pull = self.fetch_pull(number)?;
        self.facts_for(pull)
    }

    fn create_pr(&self, request: &NewPullRequest) -> Result<PullRequestFacts> {
        let payload = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
            "draft": request.draft,
        });
        let response = self.send(self.client.post(self.repo_url("/pulls")).json(&payload), None)?;
        let pull: ApiPullRequest = response.json()?;
        let number = pull.number;
        self.request_reviewers(number, &request.reviewers)?;
        self.add_labels(number, &request.labels)?;
        self.get_pr(number)
    }

    fn update_pr(&self, number: u64, update: &PullRequestUpdate) -> Result<PullRequestFacts> {
        let mut payload = serde_json::Map::new();
        if let Some(title) = &update.title {
            payload.insert("title".into(), json!(title));
        }
        if let Some(body) = &update.body {
            payload.insert("body".into(), json!(body));
        }
        match update.state {
            Some(PrState::Open) => {
                payload.insert("state".into(), json!("open"));
            }
            Some(PrState::Closed) => {
                payload.insert("state".into(), json!("closed"));
            }
            Some(other) => log::warn!("Ignoring unsupported state change to '{}'", other),
            None => {}
        }
        if update.draft.is_some() {
            // The REST API cannot toggle draft status; that needs GraphQL.
            log::warn!("Draft status cannot be changed through the REST backend");
        }
        if !payload.is_empty() {
            let url = self.repo_url(&format!("/pulls/{}", number));
            self.send(
                self.client.patch(url).json(&serde_json::Value::Object(payload)),
                Some(number),
            )?;
        }
        self.get_pr(number)
    }

    fn merge_pr(&self, number: u64, request: &MergeRequest) -> Result<bool> {
        let head_branch = if request.delete_branch {
            Some(self.fetch_pull(number)?.head.name)
        } else {
            None
        };

        let mut payload = serde_json::Map::new();
        payload.insert("merge_method".into(), json!(request.method.as_str()));
        if let Some(title) = &request.commit_title {
            payload.insert("commit_title".into(), json!(title));
        }
        if let Some(message) = &request.commit_message {
            payload.insert("commit_message".into(), json!(message));
        }

        let url = self.repo_url(&format!("/pulls/{}/merge", number));
        let response = self.send(
            self.client.put(url).json(&serde_json::Value::Object(payload)),
            Some(number),
        )?;
        let result: serde_json::Value = response.json()?;
        let merged = result.get("merged").and_then(|v| v.as_bool()).unwrap_or(false);

        if merged {
            if let Some(branch) = head_branch {
                if let Err(e) = self.delete_remote_branch(&branch) {
                    log::warn!("Merged, but failed to delete branch '{}': {}", branch, e);
                }
            }
        }
        Ok(merged)
    }

    fn get_checks(&self, number: u64) -> Result<Vec<CheckResult>> {
        let pull = self.fetch_pull(number)?;
        self.checks_for_sha(&pull.head.sha)
    }

    fn get_reviews(&self, number: u64) -> Result<Vec<ReviewResult>> {
        self.reviews_for(number)
    }

    fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        let url = self.repo_url(&format!("/pulls/{}/requested_reviewers", number));
        self.send(
            self.client.post(url).json(&json!({ "reviewers": reviewers })),
            Some(number),
        )?;
        Ok(())
    }

    fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let url = self.repo_url(&format!("/issues/{}/labels", number));
        self.send(
            self.client.post(url).json(&json!({ "labels": labels })),
            Some(number),
        )?;
        Ok(())
    }

    fn get_default_branch(&self) -> Result<String> {
        let repo: serde_json::Value = self.get_json("", None)?;
        Ok(repo
            .get("default_branch")
            .and_then(|v| v.as_str())
            .unwrap_or("main")
            .to_string())
    }

    fn list_prs(&self, filter: &ListFilter) -> Result<Vec<PullRequestFacts>> {
        // REST has no "merged" state filter: fetch closed and keep merged ones.
        let api_state = match filter.state {
            ListState::Open => "open",
            ListState::Closed | ListState::Merged => "closed",
            ListState::All => "all",
        };
        let mut query = vec![
            ("state", api_state.to_string()),
            ("per_page", filter.limit.min(100).to_string()),
        ];
        if let Some(head) = &filter.head {
            query.push(("head", format!("{}:{}", self.owner, head)));
        }
        if let Some(base) = &filter.base {
            query.push(("base", base.clone()));
        }

        let response = self.send(self.client.get(self.repo_url("/pulls")).query(&query), None)?;
        let pulls: Vec<ApiPullRequest> = response.json()?;

        let mut facts = Vec::new();
        for pull in pulls.into_iter().take(filter.limit) {
            let pr = self.facts_for(pull)?;
            let keep = match filter.state {
                ListState::Merged => pr.is_merged(),
                ListState::Closed => !pr.is_merged(),
                _ => true,
            };
            if keep {
                facts.push(pr);
            }
        }
        Ok(facts)
    }

    fn get_repo_info(&self) -> Result<RepoInfo> {
        Ok(RepoInfo {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            url: format!("https://github.com/{}/{}", self.owner, self.repo),
        })
    }
}
