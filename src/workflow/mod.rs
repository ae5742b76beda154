//! PR workflows.
//!
//! Each workflow takes a [`WorkflowContext`] holding the configuration and
//! every collaborator it may touch. Nothing here reads global state, so the
//! same code runs against real backends in `main` and against the fakes in
//! tests.

pub mod branch;
pub mod checks;
pub mod conflicts;
pub mod create;
pub mod merge;
pub mod status;
pub mod update;

pub use branch::{branch_status, create_branch, BranchStatus, CreateBranchOptions, CreatedBranch};
pub use checks::{handle_failed_checks, retrigger_checks, wait_for_checks, CheckAction, CheckWait};
pub use conflicts::{count_conflict_markers, resolve_pr_conflicts, ConflictResolver, Resolution};
pub use create::{create_pr, CreateOptions, CreateOutcome};
pub use merge::{merge_pr, MergeOptions, MergeOutcome};
pub use status::{pr_status, resolve_pr_number, PrStatus};
pub use update::{update_pr, UpdateOptions, UpdateOutcome};

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::git::Vcs;
use crate::llm::{self, LanguageModel, LlmRequest};
use crate::output::{print_info, print_prompt, print_step, print_success, print_warning};
use crate::platform::Platform;
use crate::prompt::Prompter;
use crate::prompts::SYSTEM_PROMPT;

/// Time source for the polling loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock that really sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Configuration and collaborators for one workflow run.
pub struct WorkflowContext<'a> {
    pub config: &'a Config,
    pub platform: &'a dyn Platform,
    pub vcs: &'a dyn Vcs,
    pub llm: &'a dyn LanguageModel,
    pub prompter: &'a dyn Prompter,
    pub clock: &'a dyn Clock,
    /// Suppress progress output (errors are still reported by the caller).
    pub quiet: bool,
}

impl<'a> WorkflowContext<'a> {
    pub fn step(&self, message: &str) {
        if !self.quiet {
            print_step(message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            print_info(message);
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            print_success(message);
        }
    }

    pub fn warn(&self, message: &str) {
        log::warn!("{}", message);
        if !self.quiet {
            print_warning(message);
        }
    }

    /// Run one generation with the configured model settings.
    pub fn generate(&self, user_prompt: String, generation: &GenerationOptions) -> Result<String> {
        if generation.show_prompt && !self.quiet {
            print_prompt(&user_prompt);
        }
        let request = LlmRequest {
            model: generation
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            max_retries: self.config.max_retries,
        };
        log::debug!("Generating text with model '{}'", request.model);
        let raw = llm::generate(self.llm, &request)?;
        Ok(llm::clean_message(&raw))
    }
}

/// Text generation flags shared by create, update and merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Overrides `config.model`.
    pub model: Option<String>,
    /// Overrides `config.language`.
    pub language: Option<String>,
    pub hint: Option<String>,
    pub show_prompt: bool,
}

impl GenerationOptions {
    pub fn language<'c>(&'c self, config: &'c Config) -> Option<&'c str> {
        self.language.as_deref().or(config.language.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PullRequestFacts;
    use crate::test_utils::{FakeLlm, FakePlatform, FakeVcs, ManualClock, ScriptedPrompter};

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(30));
        assert_eq!(clock.now() - start, Duration::from_secs(30));
        assert_eq!(clock.sleeps.get(), 1);
    }

    #[test]
    fn test_generation_language_prefers_flag_over_config() {
        let config = Config {
            language: Some("German".into()),
            ..Config::default()
        };
        let flag = GenerationOptions {
            language: Some("French".into()),
            ..Default::default()
        };
        assert_eq!(flag.language(&config), Some("French"));
        assert_eq!(GenerationOptions::default().language(&config), Some("German"));
    }

    #[test]
    fn test_generate_uses_config_and_cleans_output() {
        let config = Config::default();
        let platform = FakePlatform::single(PullRequestFacts::open(1, "f", "main"));
        let vcs = FakeVcs::on_branch("f");
        let llm = FakeLlm::replying("```\nfeat: add retry\n```");
        let prompter = ScriptedPrompter::non_interactive();
        let clock = ManualClock::new();
        let ctx = WorkflowContext {
            config: &config,
            platform: &platform,
            vcs: &vcs,
            llm: &llm,
            prompter: &prompter,
            clock: &clock,
            quiet: true,
        };

        let options = GenerationOptions {
            model: Some("openrouter:gpt-4o".into()),
            ..Default::default()
        };
        let text = ctx.generate("describe".into(), &options).unwrap();

        assert_eq!(text, "feat: add retry");
        let requests = llm.requests.borrow();
        assert_eq!(requests[0].model, "openrouter:gpt-4o");
        assert_eq!(requests[0].max_tokens, config.max_tokens);
        assert_eq!(requests[0].system_prompt, SYSTEM_PROMPT);
    }
}
