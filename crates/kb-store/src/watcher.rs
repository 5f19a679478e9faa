// watcher.rs — Expiration sweep.
//
// Every poll interval the watcher lists expired records, revokes the role
// from each member, and deletes the record. A revoke that the platform
// refuses is logged and the record is kept for the next sweep, unless the
// platform answered 404: the member has left, so the record is dropped. A
// store failure ends the watch with an error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use kb_platform::Platform;
use kb_record::{ErrorRecord, LifecycleEvent};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::JsonPlayerStore;

/// What the watcher acts on.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub guild_id: String,
    /// Role to revoke. `None` when no role exists this run: expired records
    /// are then only removed from the store.
    pub role_id: Option<String>,
    pub poll_interval: Duration,
}

/// Result of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Member ids whose records were removed.
    pub removed: Vec<String>,
    /// Member ids kept because the revoke failed.
    pub retained: Vec<String>,
}

impl SweepOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.retained.is_empty()
    }
}

/// Process every record expired at `now`.
pub async fn sweep(
    store: &JsonPlayerStore,
    platform: &dyn Platform,
    target: &WatchTarget,
    now: DateTime<Utc>,
) -> Result<SweepOutcome, StoreError> {
    let mut outcome = SweepOutcome::default();

    for record in store.expired(now)? {
        if let Some(role_id) = &target.role_id {
            match platform
                .remove_member_role(&target.guild_id, &record.id, role_id)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::info!(member_id = %record.id, error = %e, "member gone, dropping record");
                }
                Err(e) => {
                    ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::ExpirationRevoke)
                        .set("session", &record.id)
                        .log_warn();
                    outcome.retained.push(record.id);
                    continue;
                }
            }
        }
        store.delete(&record.id)?;
        tracing::info!(member_id = %record.id, "player record expired");
        outcome.removed.push(record.id);
    }

    Ok(outcome)
}

/// Sweep on every tick until `cancel` fires or the store fails.
///
/// Returns how many records were removed over the whole watch.
pub(crate) async fn watch(
    store: &JsonPlayerStore,
    cancel: CancellationToken,
    platform: &dyn Platform,
    target: &WatchTarget,
) -> Result<usize, StoreError> {
    let mut ticker = tokio::time::interval(target.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut removed = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(removed, "expiration watch cancelled");
                return Ok(removed);
            }
            _ = ticker.tick() => {
                let outcome = sweep(store, platform, target, Utc::now()).await?;
                if !outcome.is_empty() {
                    tracing::info!(
                        removed = outcome.removed.len(),
                        retained = outcome.retained.len(),
                        "expiration sweep"
                    );
                }
                removed += outcome.removed.len();
            }
        }
    }
}
