//! Host detection and backend selection.

use regex::Regex;
use std::fmt;

use super::gh_cli::GhCli;
use super::github_api::GithubApi;
use super::Platform;
use crate::error::{AutoPrError, Result};

/// Environment variables checked for a GitHub token, in order.
pub const GITHUB_TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    GitHub,
    GitLab,
    Bitbucket,
    Azure,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::GitHub => "github",
            PlatformKind::GitLab => "gitlab",
            PlatformKind::Bitbucket => "bitbucket",
            PlatformKind::Azure => "azure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Some(PlatformKind::GitHub),
            "gitlab" => Some(PlatformKind::GitLab),
            "bitbucket" => Some(PlatformKind::Bitbucket),
            "azure" | "azure-devops" => Some(PlatformKind::Azure),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Guess the hosting platform from a git remote URL.
pub fn detect_platform(remote_url: &str) -> Option<PlatformKind> {
    let url = remote_url.to_lowercase();
    if url.contains("github.com") {
        Some(PlatformKind::GitHub)
    } else if url.contains("gitlab") {
        Some(PlatformKind::GitLab)
    } else if url.contains("bitbucket") {
        Some(PlatformKind::Bitbucket)
    } else if url.contains("dev.azure.com") || url.contains("visualstudio.com") {
        Some(PlatformKind::Azure)
    } else {
        None
    }
}

/// Extract `(owner, repo)` from an SSH or HTTPS remote URL.
pub fn parse_repo_slug(remote_url: &str) -> Option<(String, String)> {
    let re = Regex::new(r"^(?:[a-z+]+://)?(?:[^@/]+@)?[^:/]+[:/]+([^/]+)/([^/]+?)(?:\.git)?/?$")
        .ok()?;
    let caps = re.captures(remote_url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Inputs a backend constructor may need.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    pub remote_url: String,
    pub token: Option<String>,
    pub gh_available: bool,
}

impl ProviderContext {
    /// Collect context from the environment: token variables and `gh auth status`.
    pub fn from_env(remote_url: impl Into<String>) -> Self {
        let token = GITHUB_TOKEN_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        Self {
            remote_url: remote_url.into(),
            token,
            gh_available: GhCli::is_authenticated(),
        }
    }
}

pub type PlatformConstructor = fn(&ProviderContext) -> Result<Box<dyn Platform>>;

/// Maps platform kinds to backend constructors.
pub struct PlatformRegistry {
    providers: Vec<(PlatformKind, PlatformConstructor)>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PlatformKind::GitHub, github_provider);
        registry
    }
}

impl PlatformRegistry {
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: PlatformKind, constructor: PlatformConstructor) {
        self.providers.retain(|(k, _)| *k != kind);
        self.providers.push((kind, constructor));
    }

    pub fn supported(&self) -> Vec<PlatformKind> {
        self.providers.iter().map(|(k, _)| *k).collect()
    }

    pub fn create(&self, kind: PlatformKind, ctx: &ProviderContext) -> Result<Box<dyn Platform>> {
        let constructor = self
            .providers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                AutoPrError::PlatformUnavailable(format!(
                    "{} is not supported yet (supported: {})",
                    kind,
                    self.supported()
                        .iter()
                        .map(PlatformKind::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
        let platform = constructor(ctx)?;
        log::debug!("Using {} backend for {}", platform.name(), kind);
        Ok(platform)
    }

    /// Detect the platform from the remote (or use `override_kind`) and build it.
    pub fn resolve(&self, override_kind: Option<PlatformKind>, ctx: &ProviderContext) -> Result<Box<dyn Platform>> {
        let kind = match override_kind {
            Some(kind) => kind,
            None => detect_platform(&ctx.remote_url).ok_or_else(|| {
                AutoPrError::PlatformUnavailable(format!(
                    "Could not detect a hosting platform from remote '{}'",
                    ctx.remote_url
                ))
            })?,
        };
        self.create(kind, ctx)
    }
}

/// GitHub: prefer an authenticated `gh`, fall back to the REST API with a token.
fn github_provider(ctx: &ProviderContext) -> Result<Box<dyn Platform>> {
    if ctx.gh_available {
        return Ok(Box::new(GhCli::new()));
    }
    if let Some(token) = &ctx.token {
        let (owner, repo) = parse_repo_slug(&ctx.remote_url).ok_or_else(|| {
            AutoPrError::Platform(format!(
                "Could not parse owner/repo from remote '{}'",
                ctx.remote_url
            ))
        })?;
        return Ok(Box::new(GithubApi::new(token.clone(), owner, repo)?));
    }
    Err(AutoPrError::PlatformUnavailable(
        "GitHub CLI is not authenticated and no GITHUB_TOKEN/GH_TOKEN is set".to_string(),
    ))
}
