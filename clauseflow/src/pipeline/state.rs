//! The orchestrator's run-state machine.

use serde::{Deserialize, Serialize};

/// The state of one pipeline run.
///
/// `Idle -> Running(stage) -> ... -> Completed`, with `Failed` reachable from
/// any `Running` state. Terminal states never transition again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "stage")]
pub enum RunState {
    /// No stage has started yet.
    Idle,
    /// The named stage is executing.
    Running(String),
    /// Every required stage finished.
    Completed,
    /// The run aborted; remaining stages did not execute.
    Failed,
}

impl RunState {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the currently running stage, if any.
    #[must_use]
    pub fn running_stage(&self) -> Option<&str> {
        match self {
            Self::Running(stage) => Some(stage),
            _ => None,
        }
    }

    /// Whether a transition to `next` is legal.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Idle | Self::Running(_), Self::Running(_))
            | (Self::Running(_), Self::Completed | Self::Failed) => true,
            // A pre-cancelled run fails before its first stage starts; a run
            // whose every stage is gated off completes without ever running.
            (Self::Idle, Self::Failed | Self::Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running(stage) => write!(f, "running({stage})"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running("review".to_string()).is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        let idle = RunState::Idle;
        let running = RunState::Running("review".to_string());
        let next = RunState::Running("risk".to_string());

        assert!(idle.can_transition_to(&running));
        assert!(running.can_transition_to(&next));
        assert!(running.can_transition_to(&RunState::Completed));
        assert!(running.can_transition_to(&RunState::Failed));
        assert!(idle.can_transition_to(&RunState::Failed));
        assert!(idle.can_transition_to(&RunState::Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunState::Completed.can_transition_to(&RunState::Running("x".to_string())));
        assert!(!RunState::Failed.can_transition_to(&RunState::Completed));
    }

    #[test]
    fn test_running_stage() {
        assert_eq!(
            RunState::Running("clause".to_string()).running_stage(),
            Some("clause")
        );
        assert_eq!(RunState::Idle.running_stage(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::Running("risk".to_string()).to_string(), "running(risk)");
        assert_eq!(RunState::Completed.to_string(), "completed");
    }
}
