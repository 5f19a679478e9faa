// session.rs — Session: per-run state owned by the orchestrator.

use kb_platform::BotUser;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::signal::ShutdownSignal;
use crate::state::LifecycleState;

/// One process run, from store connect to the end of shutdown.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    /// Identity the platform connection authenticated as, once open.
    pub bot_user: Option<BotUser>,
    pub signal: ShutdownSignal,
    /// Id of the role that exists on the platform this run. Set only after
    /// its delete compensation has been registered.
    pub role_id: Option<String>,
    state: LifecycleState,
}

impl Session {
    pub fn new(signal: ShutdownSignal) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_user: None,
            signal,
            role_id: None,
            state: LifecycleState::Starting,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn transition(&mut self, next: LifecycleState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(&next) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(session_id = %self.id, from = %self.state, to = %next, "lifecycle transition");
        self.state = next;
        Ok(())
    }

    /// Like `transition`, but a rejected transition is only logged. Used on
    /// shutdown paths that must keep going.
    pub fn advance(&mut self, next: LifecycleState) {
        if let Err(e) = self.transition(next) {
            tracing::warn!(session_id = %self.id, error = %e, "lifecycle transition skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_without_role() {
        let session = Session::new(ShutdownSignal::new());
        assert_eq!(session.state(), LifecycleState::Starting);
        assert!(session.role_id.is_none());
        assert!(session.bot_user.is_none());
    }

    #[test]
    fn invalid_transition_is_an_error() {
        let mut session = Session::new(ShutdownSignal::new());
        let err = session.transition(LifecycleState::Running).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(session.state(), LifecycleState::Starting);
    }

    #[test]
    fn advance_logs_and_keeps_state() {
        let mut session = Session::new(ShutdownSignal::new());
        session.advance(LifecycleState::Stopped);
        assert_eq!(session.state(), LifecycleState::Starting);
        session.advance(LifecycleState::Provisioning);
        assert_eq!(session.state(), LifecycleState::Provisioning);
    }
}
