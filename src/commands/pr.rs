//! create-pr, update-pr and merge-pr handlers.
//!
//! Workflows report progress themselves; these handlers print the final
//! result. With `--quiet` only the essentials go to stdout so the output can
//! be piped.

use crate::error::Result;
use crate::output::{
    print_already_merged, print_pr_already_exists, print_pr_created, print_pr_merged,
    print_pr_updated, print_section_banner, BannerColor,
};
use crate::workflow::{
    create_pr, merge_pr, update_pr, CreateOptions, CreateOutcome, MergeOptions, MergeOutcome,
    UpdateOptions, WorkflowContext,
};

pub fn create_pr_command(ctx: &WorkflowContext, options: &CreateOptions) -> Result<()> {
    banner(ctx, "CREATE PR");
    match create_pr(ctx, options)? {
        CreateOutcome::Created {
            number,
            url,
            draft,
            state,
        } => {
            log::debug!("PR #{} created in state {}", number, state);
            if ctx.quiet {
                println!("{}", url);
            } else {
                print_pr_created(number, &url, draft);
            }
        }
        CreateOutcome::AlreadyExists { number, url } => {
            if ctx.quiet {
                println!("{}", url);
            } else {
                print_pr_already_exists(number, &url);
            }
        }
        CreateOutcome::Updated { number, url } => {
            if ctx.quiet {
                println!("{}", url);
            } else {
                print_pr_updated(number, &url);
            }
        }
        CreateOutcome::DryRun { title, body } => {
            // The preview was suppressed
            if ctx.quiet {
                print_message(&title, &body);
            }
        }
    }
    Ok(())
}

pub fn update_pr_command(ctx: &WorkflowContext, options: &UpdateOptions) -> Result<()> {
    banner(ctx, "UPDATE PR");
    let outcome = update_pr(ctx, options)?;
    if ctx.quiet {
        println!("{}", outcome.url);
    } else {
        print_pr_updated(outcome.number, &outcome.url);
    }
    Ok(())
}

pub fn merge_pr_command(ctx: &WorkflowContext, options: &MergeOptions) -> Result<()> {
    banner(ctx, "MERGE PR");
    match merge_pr(ctx, options)? {
        MergeOutcome::AlreadyMerged { number } => {
            if !ctx.quiet {
                print_already_merged(number);
            }
        }
        MergeOutcome::Merged {
            number,
            url,
            method,
            title,
        } => {
            log::debug!("Merged PR #{} as '{}'", number, title);
            if ctx.quiet {
                println!("{}", url);
            } else {
                print_pr_merged(number, method.as_str(), &url);
            }
        }
        MergeOutcome::MessageOnly { title, body, .. } => {
            if ctx.quiet {
                print_message(&title, &body);
            }
        }
    }
    Ok(())
}

fn banner(ctx: &WorkflowContext, title: &str) {
    if !ctx.quiet {
        print_section_banner(title, BannerColor::Cyan);
    }
}

/// Plain title and body, for piping into other tools.
fn print_message(title: &str, body: &str) {
    println!("{}", format_message(title, body));
}

fn format_message(title: &str, body: &str) -> String {
    if body.trim().is_empty() {
        title.to_string()
    } else {
        format!("{}\n\n{}", title, body.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PullRequestFacts;
    use crate::test_utils::{FakePlatform, Harness};

    #[test]
    fn test_format_message() {
        assert_eq!(format_message("fix: typo", ""), "fix: typo");
        assert_eq!(
            format_message("feat: retries", "Adds retries.\n"),
            "feat: retries\n\nAdds retries."
        );
    }

    #[test]
    fn test_create_command_runs_workflow() {
        let h = Harness::new(FakePlatform::new(vec![]));
        let options = CreateOptions {
            yes: true,
            ..Default::default()
        };

        create_pr_command(&h.ctx(), &options).unwrap();

        assert!(h.platform.called("create_pr"));
    }

    #[test]
    fn test_merge_command_propagates_errors() {
        let mut facts = PullRequestFacts::open(3, "feature", "main");
        facts.is_draft = true;
        let h = Harness::new(FakePlatform::single(facts));
        let options = MergeOptions {
            pr_number: Some(3),
            yes: true,
            ..Default::default()
        };

        let err = merge_pr_command(&h.ctx(), &options).unwrap_err();

        assert_eq!(err.exit_code(), crate::error::EXIT_BLOCKED);
        assert!(!h.platform.called("merge_pr"));
    }
}
