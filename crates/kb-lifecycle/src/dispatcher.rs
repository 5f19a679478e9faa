// dispatcher.rs — Dispatcher: the handler registered with the platform.
//
// Wraps the real inbound-event handler. Every event runs on its own tracked
// task so the shutdown path can wait for in-flight handlers. Once the
// shutdown signal has fired, new events are dropped, and handlers already
// running see the signal through the token they were given.

use std::sync::Arc;

use async_trait::async_trait;
use kb_platform::{EventHandler, PlatformEvent};
use kb_record::{ErrorRecord, LifecycleEvent};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::signal::{ShutdownSignal, CAUSE_SESSION_SHUTDOWN};

/// Application-side handler for inbound platform events.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Handle one event. `cancel` fires when shutdown begins; work that can
    /// take a while should stop once it does.
    async fn handle(&self, event: PlatformEvent, cancel: CancellationToken);
}

pub struct Dispatcher {
    inner: Arc<dyn InboundHandler>,
    signal: ShutdownSignal,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(inner: Arc<dyn InboundHandler>, signal: ShutdownSignal) -> Self {
        Self {
            inner,
            signal,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of handler tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting events and wait for the in-flight ones to finish.
    ///
    /// Fires the signal if nothing else has. Safe to call more than once.
    pub async fn halt_until_all_done(&self) {
        self.signal.fire(CAUSE_SESSION_SHUTDOWN);
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("dispatcher halted");
    }
}

#[async_trait]
impl EventHandler for Dispatcher {
    async fn handle(&self, event: PlatformEvent) {
        // Held across the fired check so a concurrent halt cannot finish
        // waiting before this event's task is tracked.
        let guard = self.tracker.token();
        if self.signal.is_fired() {
            tracing::debug!(?event, "event dropped after shutdown");
            return;
        }
        let inner = Arc::clone(&self.inner);
        let cancel = self.signal.token();
        self.tracker.spawn(async move { inner.handle(event, cancel).await });
        drop(guard);
    }
}

/// Default inbound handler: records each event in the log.
#[derive(Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl InboundHandler for LoggingHandler {
    async fn handle(&self, event: PlatformEvent, _cancel: CancellationToken) {
        match event {
            PlatformEvent::Ready { user } => {
                tracing::info!(user_id = %user.id, username = %user.username, "platform ready");
            }
            PlatformEvent::CommandInvocation {
                command,
                guild_id,
                member_id,
            } => ErrorRecord::new(None)
                .event(LifecycleEvent::CommandInvoked)
                .set("command", command)
                .set("guild_id", guild_id)
                .set("member_id", member_id)
                .log_info(),
        }
    }
}
