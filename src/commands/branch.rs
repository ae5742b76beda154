//! create-branch handler.

use crate::error::Result;
use crate::output::{print_branch_created, print_push_success};
use crate::workflow::{create_branch, CreateBranchOptions, WorkflowContext};

pub fn create_branch_command(ctx: &WorkflowContext, options: &CreateBranchOptions) -> Result<()> {
    let created = create_branch(ctx, options)?;
    if ctx.quiet {
        println!("{}", created.name);
        return Ok(());
    }
    print_branch_created(&created.name, &created.base);
    if created.pushed {
        print_push_success();
    }
    Ok(())
}
