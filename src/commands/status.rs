//! Status command handler.
//!
//! Shows the derived lifecycle state of one PR with its checks, reviews,
//! blocking reasons and the transitions available from here.

use crate::error::Result;
use crate::output::{print_info, print_pr_status};
use crate::workflow::{pr_status, WorkflowContext};

/// Display status for `pr_number`, or for the PR of the current branch.
///
/// With `--quiet` only the state name is printed.
pub fn status_command(ctx: &WorkflowContext, pr_number: Option<u64>) -> Result<()> {
    let status = pr_status(ctx, pr_number)?;
    if ctx.quiet {
        println!("{}", status.state);
        return Ok(());
    }

    print_pr_status(
        status.repo.as_ref(),
        &status.facts,
        status.state,
        ctx.config.required_approvals,
        &status.valid_triggers,
        status.ahead_behind,
    );
    if !status.facts.reviews.is_empty() && !status.approval.approved {
        print_info(&status.approval.message);
    }
    Ok(())
}
