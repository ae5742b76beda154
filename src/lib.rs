pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod git;
pub mod lifecycle;
pub mod llm;
pub mod logging;
pub mod output;
pub mod platform;
pub mod progress;
pub mod prompt;
pub mod prompts;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{AutoPrError, Result};
pub use lifecycle::{derive_state, LifecycleState, PrStateMachine};
pub use platform::{Platform, PullRequestFacts};
pub use workflow::WorkflowContext;
