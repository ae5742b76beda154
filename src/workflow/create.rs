//! The create-PR workflow.

use super::branch::{branch_status, resolve_base};
use super::update::{update_pr, UpdateOptions};
use super::{GenerationOptions, WorkflowContext};
use crate::error::{AutoPrError, Result};
use crate::git::{PushOptions, PushResult};
use crate::lifecycle::{derive_state, LifecycleState, PrStateMachine};
use crate::llm::{split_title_body, LlmError};
use crate::output::print_generated_text;
use crate::platform::NewPullRequest;
use crate::prompts::{build_pr_description_prompt, build_pr_title_prompt, PromptContext};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// Defaults to the repository's default branch.
    pub base: Option<String>,
    /// Generate only a title and leave the description empty.
    pub title_only: bool,
    pub draft: bool,
    /// Generate and preview without pushing or creating anything.
    pub dry_run: bool,
    pub yes: bool,
    /// Ask for testing and notes sections in the description.
    pub verbose: bool,
    pub reviewers: Vec<String>,
    pub labels: Vec<String>,
    pub generation: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created {
        number: u64,
        url: String,
        draft: bool,
        state: LifecycleState,
    },
    /// An open PR for the branch exists and was left alone.
    AlreadyExists { number: u64, url: String },
    /// An open PR for the branch exists and its description was regenerated.
    Updated { number: u64, url: String },
    DryRun { title: String, body: String },
}

pub fn create_pr(ctx: &WorkflowContext, options: &CreateOptions) -> Result<CreateOutcome> {
    let head = ctx.vcs.current_branch()?;
    let base = resolve_base(ctx, options.base.as_deref())?;
    if head == base {
        return Err(AutoPrError::Git(format!(
            "Currently on the base branch '{}'. Create a feature branch first.",
            base
        )));
    }

    if let Some(existing) = ctx.platform.find_pr_for_branch(&head, Some(&base))? {
        return reuse_existing(ctx, options, existing.number, existing.url);
    }

    let status = branch_status(ctx, &base)?;
    if !status.has_changes() {
        return Err(AutoPrError::Git(format!(
            "No commits on '{}' ahead of '{}'",
            head, base
        )));
    }
    if !status.is_up_to_date() {
        ctx.warn(&format!(
            "'{}' is {} commit(s) behind origin/{}; consider rebasing first",
            head, status.behind, base
        ));
    }

    ctx.step("Collecting changes...");
    let range = format!("origin/{}...HEAD", base);
    let diff = ctx.vcs.diff(&range)?;
    if diff.trim().is_empty() {
        return Err(AutoPrError::Git(format!(
            "No changes between '{}' and '{}'",
            base, head
        )));
    }
    let diff_stat = ctx.vcs.diff_stat(&range)?;

    let prompt_ctx = PromptContext {
        head: &head,
        base: &base,
        diff: &diff,
        diff_stat: &diff_stat,
        hint: options.generation.hint.as_deref(),
        language: options.generation.language(ctx.config),
    };
    let prompt = if options.title_only {
        build_pr_title_prompt(&prompt_ctx)
    } else {
        build_pr_description_prompt(&prompt_ctx, options.verbose)
    };

    ctx.step("Generating PR text...");
    let message = ctx.generate(prompt, &options.generation)?;
    let (title, body) = split_title_body(&message);
    if title.is_empty() {
        return Err(LlmError::Failed("model returned an empty title".into()).into());
    }
    let body = if options.title_only { String::new() } else { body };

    if !ctx.quiet {
        print_generated_text(&title, &body);
    }
    if options.dry_run {
        ctx.info("Dry run: nothing pushed or created");
        return Ok(CreateOutcome::DryRun { title, body });
    }
    if !options.yes && !ctx.prompter.confirm("Create this pull request?", true) {
        return Err(AutoPrError::Aborted("PR creation cancelled".into()));
    }

    push_head(ctx, &head, status.pushed)?;

    let request = NewPullRequest {
        title,
        body,
        head: head.clone(),
        base,
        draft: options.draft,
        reviewers: options.reviewers.clone(),
        labels: options.labels.clone(),
    };
    let created = ctx.platform.create_pr(&request)?;

    let mut machine = PrStateMachine::new(Some(created.number));
    machine.transition(if options.draft { "create_draft" } else { "publish" })?;
    machine.set_state(derive_state(&created));

    Ok(CreateOutcome::Created {
        number: created.number,
        url: created.url,
        draft: options.draft,
        state: machine.current_state(),
    })
}

fn reuse_existing(
    ctx: &WorkflowContext,
    options: &CreateOptions,
    number: u64,
    url: String,
) -> Result<CreateOutcome> {
    ctx.info(&format!("PR #{} already exists for this branch: {}", number, url));
    let regenerate = ctx.prompter.is_interactive()
        && !options.dry_run
        && ctx
            .prompter
            .confirm(&format!("Regenerate the description of PR #{}?", number), false);
    if !regenerate {
        return Ok(CreateOutcome::AlreadyExists { number, url });
    }

    let update = UpdateOptions {
        pr_number: Some(number),
        yes: options.yes,
        generation: options.generation.clone(),
    };
    let updated = update_pr(ctx, &update)?;
    Ok(CreateOutcome::Updated {
        number: updated.number,
        url: updated.url,
    })
}

fn push_head(ctx: &WorkflowContext, head: &str, pushed: bool) -> Result<()> {
    let options = if pushed {
        PushOptions::default()
    } else {
        PushOptions::upstream()
    };
    ctx.step(&format!("Pushing branch '{}'...", head));
    match ctx.vcs.push(head, options)? {
        PushResult::Success => Ok(()),
        PushResult::AlreadyUpToDate => {
            log::debug!("'{}' already up to date on origin", head);
            Ok(())
        }
        PushResult::Error(message) => Err(AutoPrError::Git(format!(
            "Failed to push '{}': {}",
            head, message
        ))),
    }
}
