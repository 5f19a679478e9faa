// signal.rs — ShutdownSignal: the shared, first-fire-wins cancellation signal.
//
// Any of the interrupt handler, the expiration watcher or a fatal startup
// path may fire the signal. The first caller's cause is kept; later calls
// only re-cancel the (already cancelled) token, which is a no-op.
//
// The cause is stored before the token is cancelled, so anyone who observes
// the token as cancelled also sees the cause.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cause recorded when the process receives SIGINT or SIGTERM.
pub const CAUSE_USER_STOP: &str = "execution stopped by user";

/// Cause recorded when shutdown starts without any other cause.
pub const CAUSE_SESSION_SHUTDOWN: &str = "session shutdown";

/// Cause recorded when a fatal startup step aborts the run.
pub const CAUSE_FATAL_STARTUP: &str = "fatal startup error";

/// Shared cancellation signal with a terminal cause.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` if this call was the one that fired
    /// it; `false` if it had already been fired.
    pub fn fire(&self, cause: impl Into<String>) -> bool {
        let won = self.cause.set(cause.into()).is_ok();
        self.token.cancel();
        won
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The cause given by the first `fire`, if any.
    pub fn cause(&self) -> Option<&str> {
        self.cause.get().map(String::as_str)
    }

    /// Resolves once the signal has fired.
    pub fn fired(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Token for collaborators that only need to observe cancellation.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_fire_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_fired());
        assert_eq!(signal.cause(), None);

        assert!(signal.fire("watcher failed"));
        assert!(!signal.fire(CAUSE_USER_STOP));

        assert!(signal.is_fired());
        assert_eq!(signal.cause(), Some("watcher failed"));
    }

    #[test]
    fn clones_share_state() {
        let signal = ShutdownSignal::new();
        let other = signal.clone();
        other.fire("x");
        assert!(signal.is_fired());
        assert_eq!(signal.cause(), Some("x"));
        assert!(signal.token().is_cancelled());
    }

    #[tokio::test]
    async fn fired_resolves_after_fire() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move {
            waiter.fired().await;
            waiter.cause().map(str::to_string)
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.fire("done");
        assert_eq!(task.await.unwrap(), Some("done".to_string()));
    }

    #[tokio::test]
    async fn concurrent_fires_transition_exactly_once() {
        for _ in 0..50 {
            let signal = ShutdownSignal::new();
            let a = signal.clone();
            let b = signal.clone();
            let ta = tokio::spawn(async move { a.fire(CAUSE_USER_STOP) });
            let tb = tokio::spawn(async move { b.fire("watcher failed") });
            let (wa, wb) = (ta.await.unwrap(), tb.await.unwrap());

            assert!(wa ^ wb, "exactly one fire must win");
            let expected = if wa { CAUSE_USER_STOP } else { "watcher failed" };
            assert_eq!(signal.cause(), Some(expected));
            assert!(signal.is_fired());
        }
    }
}
