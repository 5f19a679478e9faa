// state.rs — LifecycleState: the process lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the process is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing acquired yet beyond the store.
    Starting,
    /// Connection open; commands, role and reissue in progress.
    Provisioning,
    /// Provisioned; waiting for a shutdown trigger.
    Running,
    /// Running the compensation chain.
    ShuttingDown,
    /// Every compensating action has run.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Provisioning => write!(f, "provisioning"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::ShuttingDown => write!(f, "shutting_down"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

impl LifecycleState {
    /// Check whether transitioning from this state to `next` is valid.
    ///
    /// The valid transitions form a line:
    ///   Starting → Provisioning → Running → ShuttingDown → Stopped
    /// with a shortcut to ShuttingDown from the two startup states, taken
    /// when a fatal startup step aborts the run.
    pub fn can_transition_to(&self, next: &LifecycleState) -> bool {
        matches!(
            (self, next),
            (LifecycleState::Starting, LifecycleState::Provisioning)
                | (LifecycleState::Provisioning, LifecycleState::Running)
                | (LifecycleState::Running, LifecycleState::ShuttingDown)
                | (LifecycleState::ShuttingDown, LifecycleState::Stopped)
                | (LifecycleState::Starting, LifecycleState::ShuttingDown)
                | (LifecycleState::Provisioning, LifecycleState::ShuttingDown)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        use LifecycleState::*;
        let path = [Starting, Provisioning, Running, ShuttingDown, Stopped];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn fatal_startup_can_skip_to_shutdown() {
        assert!(LifecycleState::Starting.can_transition_to(&LifecycleState::ShuttingDown));
        assert!(LifecycleState::Provisioning.can_transition_to(&LifecycleState::ShuttingDown));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        assert!(!LifecycleState::Starting.can_transition_to(&LifecycleState::Running));
        assert!(!LifecycleState::Running.can_transition_to(&LifecycleState::Provisioning));
        assert!(!LifecycleState::Running.can_transition_to(&LifecycleState::Stopped));
        assert!(!LifecycleState::Stopped.can_transition_to(&LifecycleState::Starting));
        assert!(!LifecycleState::ShuttingDown.can_transition_to(&LifecycleState::ShuttingDown));
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(LifecycleState::ShuttingDown.to_string(), "shutting_down");
        let json = serde_json::to_string(&LifecycleState::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting_down\"");
    }
}
