// watcher.rs — ExpirationWatcherBridge: runs the store's expiration watch
// in the background and turns its terminal error into a shutdown trigger.

use std::sync::Arc;

use kb_platform::Platform;
use kb_record::{ErrorRecord, LifecycleEvent};
use kb_store::{PlayerStore, WatchTarget};
use tokio::task::JoinHandle;

use crate::signal::ShutdownSignal;

/// Cause recorded when the watcher stops with an error.
pub const CAUSE_WATCHER_FAILED: &str = "expiration watcher failed";

pub struct ExpirationWatcherBridge;

impl ExpirationWatcherBridge {
    /// Spawn the watch task.
    ///
    /// The task ends when `signal` fires (yielding `None`) or when the store
    /// fails. On failure it logs a `watcher_terminated` record, fires the
    /// signal so the main task starts shutting down, and yields the record.
    pub fn spawn(
        store: Arc<dyn PlayerStore>,
        platform: Arc<dyn Platform>,
        signal: ShutdownSignal,
        target: WatchTarget,
    ) -> JoinHandle<Option<ErrorRecord>> {
        tokio::spawn(async move {
            tracing::debug!(
                role_id = target.role_id.as_deref().unwrap_or(""),
                interval_ms = target.poll_interval.as_millis() as u64,
                "expiration watcher started"
            );
            match store.watch_expirations(signal.token(), platform, target).await {
                Ok(()) => {
                    tracing::debug!("expiration watcher stopped");
                    None
                }
                Err(e) => {
                    let record = ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::WatcherTerminated)
                        .set("cause", CAUSE_WATCHER_FAILED);
                    record.log_error();
                    signal.fire(CAUSE_WATCHER_FAILED);
                    Some(record)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_platform::MockPlatform;
    use kb_store::JsonPlayerStore;
    use std::time::Duration;
    use tempfile::tempdir;

    fn target() -> WatchTarget {
        WatchTarget {
            guild_id: "guild".into(),
            role_id: None,
            poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn cancellation_ends_the_task_quietly() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn PlayerStore> = Arc::new(JsonPlayerStore::connect(dir.path(), "players").unwrap());
        let signal = ShutdownSignal::new();

        let handle = ExpirationWatcherBridge::spawn(
            store,
            Arc::new(MockPlatform::new()),
            signal.clone(),
            target(),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        signal.fire("test");

        assert!(handle.await.unwrap().is_none());
        assert_eq!(signal.cause(), Some("test"));
    }

    #[tokio::test]
    async fn store_failure_fires_the_signal() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonPlayerStore::connect(dir.path(), "players").unwrap());
        store.close().unwrap();
        let signal = ShutdownSignal::new();

        let handle = ExpirationWatcherBridge::spawn(
            store,
            Arc::new(MockPlatform::new()),
            signal.clone(),
            target(),
        );
        signal.fired().await;

        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.event_name(), Some("watcher_terminated"));
        assert_eq!(record.get("cause"), Some(CAUSE_WATCHER_FAILED));
        assert_eq!(signal.cause(), Some(CAUSE_WATCHER_FAILED));
    }
}
