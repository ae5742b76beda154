//! Transition table and per-session PR state machine.

use thiserror::Error;

use super::state::{derive_state, LifecycleState};
use crate::platform::PullRequestFacts;

use LifecycleState::*;

/// Trigger recorded in history when the state is overwritten from fresh facts.
pub const DIRECT_SET: &str = "direct_set";

/// A legal move in the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: LifecycleState,
    pub trigger: &'static str,
    pub to: LifecycleState,
    pub description: &'static str,
}

const fn t(
    from: LifecycleState,
    trigger: &'static str,
    to: LifecycleState,
    description: &'static str,
) -> StateTransition {
    StateTransition {
        from,
        trigger,
        to,
        description,
    }
}

/// Every legal transition. No `(from, trigger)` pair appears twice.
pub static TRANSITIONS: &[StateTransition] = &[
    t(Created, "publish", Open, "PR published"),
    t(Created, "create_draft", Draft, "Created as draft"),
    t(Draft, "ready_for_review", Open, "Marked ready for review"),
    t(Draft, "close", Closed, "PR closed"),
    t(Open, "convert_to_draft", Draft, "Converted to draft"),
    t(Open, "checks_started", ChecksRunning, "CI checks started"),
    t(Open, "awaiting_review", ReviewRequired, "Awaiting review"),
    t(Open, "close", Closed, "PR closed"),
    t(ChecksRunning, "checks_pass", ChecksPassed, "All checks passed"),
    t(ChecksRunning, "checks_fail", ChecksFailed, "Some checks failed"),
    t(ChecksRunning, "conflict_detected", Conflict, "Merge conflict detected"),
    t(ChecksPassed, "approved", ReadyToMerge, "Reviews approved"),
    t(ChecksPassed, "awaiting_review", ReviewRequired, "Awaiting review"),
    t(ChecksPassed, "changes_requested", ChangesRequested, "Changes requested"),
    t(ChecksFailed, "blocked", Blocked, "Blocked by failing checks"),
    t(ChecksFailed, "retry", ChecksRunning, "Checks retriggered"),
    t(Conflict, "start_resolution", Resolution, "Starting conflict resolution"),
    t(Resolution, "resolution_complete", ChecksRunning, "Conflicts resolved"),
    t(Resolution, "resolution_failed", Conflict, "Resolution failed"),
    t(ReviewRequired, "approved", ReadyToMerge, "Reviews approved"),
    t(ReviewRequired, "changes_requested", ChangesRequested, "Changes requested"),
    t(ChangesRequested, "addressed", ReviewRequired, "Changes addressed"),
    t(ChangesRequested, "pushed", ChecksRunning, "New commits pushed"),
    t(Blocked, "unblocked", ChecksRunning, "Block removed"),
    t(Blocked, "close", Closed, "PR closed"),
    t(ReadyToMerge, "merge", Merged, "PR merged"),
    t(ReadyToMerge, "conflict", Conflict, "New conflict"),
    t(ReadyToMerge, "blocked", Blocked, "Merge blocked"),
];

/// Look up the transition for `(from, trigger)`, if the table has one.
pub fn find_transition(from: LifecycleState, trigger: &str) -> Option<&'static StateTransition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.trigger == trigger)
}

/// Triggers accepted from `state`, in table order.
pub fn triggers_from(state: LifecycleState) -> Vec<&'static str> {
    TRANSITIONS
        .iter()
        .filter(|t| t.from == state)
        .map(|t| t.trigger)
        .collect()
}

/// A trigger that is not legal from the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition: '{trigger}' from {from}. Valid triggers: [{}]", .valid.join(", "))]
pub struct TransitionError {
    pub trigger: String,
    pub from: LifecycleState,
    pub valid: Vec<&'static str>,
}

/// Lifecycle state of one PR for the duration of a single command.
#[derive(Debug, Clone, PartialEq)]
pub struct PrStateMachine {
    current_state: LifecycleState,
    history: Vec<(LifecycleState, String)>,
    pr_number: Option<u64>,
}

impl Default for PrStateMachine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PrStateMachine {
    /// Start in [`LifecycleState::Created`].
    pub fn new(pr_number: Option<u64>) -> Self {
        Self {
            current_state: Created,
            history: Vec::new(),
            pr_number,
        }
    }

    /// Build a machine whose state is derived from a facts snapshot.
    pub fn from_facts(facts: &PullRequestFacts) -> Self {
        let mut machine = Self::new(Some(facts.number));
        machine.set_state(derive_state(facts));
        machine
    }

    pub fn current_state(&self) -> LifecycleState {
        self.current_state
    }

    pub fn history(&self) -> &[(LifecycleState, String)] {
        &self.history
    }

    pub fn pr_number(&self) -> Option<u64> {
        self.pr_number
    }

    /// Apply `trigger`. On error nothing changes.
    pub fn transition(&mut self, trigger: &str) -> Result<&'static StateTransition, TransitionError> {
        let Some(transition) = find_transition(self.current_state, trigger) else {
            return Err(TransitionError {
                trigger: trigger.to_string(),
                from: self.current_state,
                valid: self.valid_triggers(),
            });
        };

        log::debug!(
            "PR {}: {} -> {} ({})",
            self.label(),
            self.current_state,
            transition.to,
            transition.description
        );
        self.history
            .push((self.current_state, trigger.to_string()));
        self.current_state = transition.to;
        Ok(transition)
    }

    /// Overwrite the state from freshly derived facts, bypassing the table.
    ///
    /// Records a `direct_set` history entry only if the state changed.
    pub fn set_state(&mut self, state: LifecycleState) {
        if state == self.current_state {
            return;
        }
        log::debug!(
            "PR {}: {} => {} (observed)",
            self.label(),
            self.current_state,
            state
        );
        self.history
            .push((self.current_state, DIRECT_SET.to_string()));
        self.current_state = state;
    }

    pub fn can_transition(&self, trigger: &str) -> bool {
        find_transition(self.current_state, trigger).is_some()
    }

    pub fn valid_triggers(&self) -> Vec<&'static str> {
        triggers_from(self.current_state)
    }

    pub fn can_merge(&self) -> bool {
        self.current_state == ReadyToMerge
    }

    pub fn needs_attention(&self) -> bool {
        self.current_state.needs_attention()
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }

    pub fn description(&self) -> &'static str {
        self.current_state.description()
    }

    fn label(&self) -> String {
        self.pr_number
            .map(|n| format!("#{}", n))
            .unwrap_or_else(|| "(unsaved)".to_string())
    }
}
