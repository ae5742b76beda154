//! PR lifecycle model.
//!
//! - [`checks`] - check summaries and flaky/blocking classification
//! - [`reviews`] - review summaries and approval quorum
//! - [`state`] - lifecycle states and the facts-to-state deriver
//! - [`machine`] - static transition table and the per-session state machine

pub mod checks;
pub mod machine;
pub mod reviews;
pub mod state;

pub use checks::{categorize_failures, is_flaky, summarize_checks, CheckSummary, FailureCategories};
pub use machine::{PrStateMachine, StateTransition, TransitionError, TRANSITIONS};
pub use reviews::{check_approval_status, ensure_approved, summarize_reviews, ApprovalStatus, ReviewSummary};
pub use state::{derive_state, LifecycleState};
