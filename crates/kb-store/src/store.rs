// store.rs — PlayerStore trait and the JSON-file-backed implementation.
//
// Each record is stored as `<path>/<bucket>/<member_id>.json`. Keys are
// checked before they become file names, so a member id can never point
// outside the bucket directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kb_platform::Platform;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::record::PlayerRecord;
use crate::watcher::{self, WatchTarget};

/// The store operations the lifecycle layer depends on.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Ids of every member that currently holds a record.
    fn player_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Revoke the role from members as their records expire.
    ///
    /// Blocks until `cancel` fires (returns `Ok(())`) or an unrecoverable
    /// store failure occurs (returns the error).
    async fn watch_expirations(
        &self,
        cancel: CancellationToken,
        platform: Arc<dyn Platform>,
        target: WatchTarget,
    ) -> Result<(), StoreError>;

    /// Close the store. Every later operation fails with `Closed`.
    fn close(&self) -> Result<(), StoreError>;
}

/// Player store backed by one JSON file per record.
pub struct JsonPlayerStore {
    bucket_dir: PathBuf,
    closed: AtomicBool,
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\'])
        || key.contains('\0');
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::IoError {
        path: path.display().to_string(),
        source,
    }
}

impl JsonPlayerStore {
    /// Open the store rooted at `path`, creating the bucket if needed.
    pub fn connect(path: impl AsRef<Path>, bucket: &str) -> Result<Self, StoreError> {
        check_key(bucket)?;
        let bucket_dir = path.as_ref().join(bucket);
        fs::create_dir_all(&bucket_dir).map_err(|e| io_error(&bucket_dir, e))?;
        tracing::debug!(bucket = %bucket_dir.display(), "player store connected");
        Ok(Self {
            bucket_dir,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn record_file(&self, id: &str) -> Result<PathBuf, StoreError> {
        check_key(id)?;
        Ok(self.bucket_dir.join(format!("{}.json", id)))
    }

    /// Directory holding the record files.
    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Save a record (creates or overwrites).
    pub fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = self.record_file(&record.id)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).map_err(|e| io_error(&path, e))
    }

    /// Delete a record. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let path = self.record_file(id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
        Ok(true)
    }

    /// All records, sorted by member id.
    ///
    /// Files that fail to parse are skipped with a warning rather than
    /// failing the whole listing.
    pub fn list(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        self.ensure_open()?;
        let entries = fs::read_dir(&self.bucket_dir).map_err(|e| io_error(&self.bucket_dir, e))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.bucket_dir, e))?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let json = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            match serde_json::from_str::<PlayerRecord>(&json) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable player record")
                }
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    /// Records whose deadline is at or before `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> Result<Vec<PlayerRecord>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.is_expired(now))
            .collect())
    }
}

#[async_trait]
impl PlayerStore for JsonPlayerStore {
    fn player_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|r| r.id).collect())
    }

    async fn watch_expirations(
        &self,
        cancel: CancellationToken,
        platform: Arc<dyn Platform>,
        target: WatchTarget,
    ) -> Result<(), StoreError> {
        let removed = watcher::watch(self, cancel, platform.as_ref(), &target).await?;
        tracing::info!(removed, "expiration watch stopped");
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        tracing::debug!(bucket = %self.bucket_dir.display(), "player store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn connect_creates_bucket_dir() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path().join("kubinka.db"), "players").unwrap();
        assert!(store.bucket_dir().is_dir());
    }

    #[test]
    fn saved_record_is_listed_unchanged() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();

        let record = PlayerRecord::new("311", Duration::hours(1));
        store.save(&record).unwrap();

        assert_eq!(store.list().unwrap(), vec![record]);
    }

    #[test]
    fn player_ids_are_sorted() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        for id in ["c", "a", "b"] {
            store.save(&PlayerRecord::new(id, Duration::hours(1))).unwrap();
        }
        assert_eq!(store.player_ids().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        store.save(&PlayerRecord::new("a", Duration::hours(1))).unwrap();
        fs::write(store.bucket_dir().join("junk.json"), b"{not json").unwrap();
        fs::write(store.bucket_dir().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(store.player_ids().unwrap(), vec!["a"]);
    }

    #[test]
    fn expired_filters_by_deadline() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        store.save(&PlayerRecord::new("old", Duration::hours(-1))).unwrap();
        store.save(&PlayerRecord::new("new", Duration::hours(1))).unwrap();

        let expired = store.expired(Utc::now()).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "old");
    }

    #[test]
    fn delete_reports_existence() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        store.save(&PlayerRecord::new("a", Duration::hours(1))).unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        assert!(matches!(store.delete("../x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            JsonPlayerStore::connect(dir.path(), ".."),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn operations_after_close_fail() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        store.close().unwrap();

        assert!(store.is_closed());
        assert!(matches!(store.player_ids(), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn store_survives_reconnect() {
        let dir = tempdir().unwrap();
        {
            let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
            store.save(&PlayerRecord::new("a", Duration::hours(1))).unwrap();
            store.close().unwrap();
        }
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        assert_eq!(store.player_ids().unwrap(), vec!["a"]);
    }
}
