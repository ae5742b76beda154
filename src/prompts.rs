//! Prompt templates for PR descriptions, titles and merge commit messages.
//!
//! Templates use `{placeholder}` markers filled with `str::replace`.

/// System prompt shared by every generation request.
pub const SYSTEM_PROMPT: &str = r#"You are an experienced software engineer writing pull request text and merge commit messages.
Write concise, accurate text grounded only in the changes you are shown.
Reply with the requested text only: no preamble, no explanations, no code fences."#;

/// Prompt for a PR title plus description.
pub const PR_DESCRIPTION_PROMPT: &str = r#"Write a pull request title and description for the changes below.

<format>
First line: a short imperative title (max 72 characters), conventional-commit style if it fits (feat:, fix:, refactor:, ...).
Then a blank line, then a markdown description with:
- ## Summary - what changed and why, in 1-3 sentences
- ## Changes - a bullet list of the notable changes
{detail_instructions}
</format>

<pr-context>
Branch: {head} -> {base}
</pr-context>
{hint_section}{language_section}
<diff-stat>
{diff_stat}
</diff-stat>

<git-diff>
{diff}
</git-diff>"#;

/// Prompt for a PR title only.
pub const PR_TITLE_PROMPT: &str = r#"Write a single-line pull request title (max 72 characters, imperative mood, conventional-commit style if it fits) for the changes below.
Reply with the title only.

<pr-context>
Branch: {head} -> {base}
</pr-context>
{hint_section}{language_section}
<diff-stat>
{diff_stat}
</diff-stat>

<git-diff>
{diff}
</git-diff>"#;

/// Prompt for the commit created when merging a PR.
pub const MERGE_COMMIT_PROMPT: &str = r#"Write the merge commit message for pull request #{number}.

<format>
First line: a short summary (max 72 characters) describing the merged change, not the act of merging.
Then a blank line, then a short body (a few bullet points at most) explaining what the PR changes.
</format>

<pr-context>
Title: {title}
Branch: {head} -> {base}
Merge method: {method}
Description:
{body}
</pr-context>
{hint_section}{language_section}
<diff-stat>
{diff_stat}
</diff-stat>

<git-diff>
{diff}
</git-diff>"#;

const VERBOSE_DETAIL: &str =
    "- ## Testing - how the change was or should be verified\n- ## Notes - risks, follow-ups or migration steps, if any";

/// Inputs shared by the prompt builders.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub head: &'a str,
    pub base: &'a str,
    pub diff: &'a str,
    pub diff_stat: &'a str,
    pub hint: Option<&'a str>,
    pub language: Option<&'a str>,
}

fn hint_section(hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => format!("\n<hint>\nAdditional context from the author: {}\n</hint>\n", h),
        None => String::new(),
    }
}

fn language_section(language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(l) if !l.eq_ignore_ascii_case("english") && !l.eq_ignore_ascii_case("en") => format!(
            "\n<language_instructions>\nWrite the text in {}. Keep conventional-commit prefixes and code identifiers in English.\n</language_instructions>\n",
            l
        ),
        _ => String::new(),
    }
}

fn fill_common(template: &str, ctx: &PromptContext) -> String {
    template
        .replace("{head}", ctx.head)
        .replace("{base}", ctx.base)
        .replace("{hint_section}", &hint_section(ctx.hint))
        .replace("{language_section}", &language_section(ctx.language))
        .replace("{diff_stat}", ctx.diff_stat.trim())
        // Diff last so placeholders inside the diff text stay untouched.
        .replace("{diff}", ctx.diff)
}

/// Title + description prompt. `verbose` asks for testing and notes sections.
pub fn build_pr_description_prompt(ctx: &PromptContext, verbose: bool) -> String {
    let detail = if verbose { VERBOSE_DETAIL } else { "" };
    fill_common(
        &PR_DESCRIPTION_PROMPT.replace("{detail_instructions}", detail),
        ctx,
    )
}

pub fn build_pr_title_prompt(ctx: &PromptContext) -> String {
    fill_common(PR_TITLE_PROMPT, ctx)
}

pub fn build_merge_commit_prompt(
    ctx: &PromptContext,
    number: u64,
    title: &str,
    body: &str,
    method: &str,
) -> String {
    let body = if body.trim().is_empty() {
        "(no description)"
    } else {
        body.trim()
    };
    // PR-authored text is filled after the template markers so it cannot inject placeholders.
    let template = MERGE_COMMIT_PROMPT
        .replace("{number}", &number.to_string())
        .replace("{method}", method);
    let filled = fill_common(&template, ctx);
    filled.replacen("{title}", title, 1).replacen("{body}", body, 1)
}
