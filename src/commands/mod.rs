//! CLI command handlers for auto-pr.
//!
//! Each handler runs one workflow against a [`WorkflowContext`] built in
//! `main` and prints the result.
//!
//! # Commands
//!
//! - [`pr`] - create, update and merge pull requests
//! - [`branch`] - create a feature branch
//! - [`status`] - lifecycle status of a PR
//! - [`config`] - show and edit configuration
//!
//! [`WorkflowContext`]: crate::workflow::WorkflowContext

mod branch;
mod config;
mod pr;
mod status;

pub use branch::create_branch_command;
pub use config::{
    config_get_command, config_path_command, config_set_command, config_show_command,
    config_to_toml_string, config_unset_command,
};
pub use pr::{create_pr_command, merge_pr_command, update_pr_command};
pub use status::status_command;
