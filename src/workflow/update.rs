//! Regenerate the description of an existing PR.

use super::status::resolve_pr_number;
use super::{GenerationOptions, WorkflowContext};
use crate::error::{AutoPrError, Result};
use crate::lifecycle::{derive_state, LifecycleState};
use crate::llm::{split_title_body, LlmError};
use crate::output::print_generated_text;
use crate::platform::PullRequestUpdate;
use crate::prompts::{build_pr_description_prompt, PromptContext};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Defaults to the open PR of the current branch.
    pub pr_number: Option<u64>,
    pub yes: bool,
    pub generation: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub number: u64,
    pub url: String,
    pub body: String,
}

pub fn update_pr(ctx: &WorkflowContext, options: &UpdateOptions) -> Result<UpdateOutcome> {
    let number = resolve_pr_number(ctx, options.pr_number)?;
    let facts = ctx.platform.get_pr(number)?;

    let state = derive_state(&facts);
    if matches!(state, LifecycleState::Merged | LifecycleState::Closed) {
        return Err(AutoPrError::PrBlocked {
            pr_number: number,
            reasons: vec![format!("PR is {}; nothing to update", facts.state)],
        });
    }

    ctx.step(&format!("Collecting changes for PR #{}...", number));
    ctx.vcs.fetch(&facts.base_branch)?;
    ctx.vcs.fetch(&facts.head_branch)?;
    let range = format!("origin/{}...origin/{}", facts.base_branch, facts.head_branch);
    let diff = ctx.vcs.diff(&range)?;
    if diff.trim().is_empty() {
        return Err(AutoPrError::Git(format!(
            "No changes between {} and {}",
            facts.base_branch, facts.head_branch
        )));
    }
    let diff_stat = ctx.vcs.diff_stat(&range)?;

    let prompt_ctx = PromptContext {
        head: &facts.head_branch,
        base: &facts.base_branch,
        diff: &diff,
        diff_stat: &diff_stat,
        hint: options.generation.hint.as_deref(),
        language: options.generation.language(ctx.config),
    };
    ctx.step("Generating PR description...");
    let message = ctx.generate(build_pr_description_prompt(&prompt_ctx, false), &options.generation)?;
    // The prompt asks for a title line; the existing title is kept.
    let (_, body) = split_title_body(&message);
    let body = if body.is_empty() { message } else { body };
    if body.trim().is_empty() {
        return Err(LlmError::Failed("model returned an empty description".into()).into());
    }

    if !ctx.quiet {
        print_generated_text(&facts.title, &body);
    }
    if !options.yes && !ctx.prompter.confirm(&format!("Update PR #{} description?", number), true) {
        return Err(AutoPrError::Aborted(format!("Update of PR #{} cancelled", number)));
    }

    let update = PullRequestUpdate {
        body: Some(body.clone()),
        ..Default::default()
    };
    let updated = ctx.platform.update_pr(number, &update)?;
    Ok(UpdateOutcome {
        number,
        url: updated.url,
        body,
    })
}
