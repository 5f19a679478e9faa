// logging.rs — Append-only log destination and subscriber setup.
//
// All output goes to one file, opened in append mode and created if absent.
// The file is never truncated: a restarted process keeps writing after the
// previous run's shutdown record.
//
// Two kinds of line share the file:
//   - lifecycle records, written by `RecordLog` as one flat JSON object each
//   - operational tracing events, written by the JSON fmt layer
//
// Record events are also emitted through tracing under `RECORD_TARGET` so
// the stderr mirror shows them. The file layer skips that target, so each
// record lands in the file exactly once.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::RecordError;
use crate::record::ErrorRecord;

/// Tracing target used for lifecycle record events.
pub const RECORD_TARGET: &str = "kb_record::record";

static RECORD_LOG: OnceLock<RecordLog> = OnceLock::new();

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Path of the append-only log file.
    pub file: PathBuf,
    /// `EnvFilter` directive, e.g. `"info"` or `"kb_lifecycle=debug"`.
    pub filter: String,
    /// Also write human-readable lines to stderr.
    pub mirror_stderr: bool,
}

/// Open (or create) the log file in append mode.
///
/// Parent directories are created as needed.
pub fn open_log_file(path: impl AsRef<Path>) -> Result<File, RecordError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RecordError::OpenFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RecordError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// One record line: timestamp and level, then the record's own keys.
#[derive(Serialize)]
struct RecordLine<'a> {
    timestamp: DateTime<Utc>,
    level: &'a str,
    #[serde(flatten)]
    record: &'a ErrorRecord,
}

/// Append-only JSON-lines writer for lifecycle records.
///
/// Each `append` writes one JSON object followed by a newline and flushes,
/// so `jq .event` works directly on the log file.
pub struct RecordLog {
    writer: Mutex<File>,
}

impl RecordLog {
    /// Open (or create) the record log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Ok(Self {
            writer: Mutex::new(open_log_file(path)?),
        })
    }

    /// Append one record at the given level.
    pub fn append(&self, level: Level, record: &ErrorRecord) -> Result<(), RecordError> {
        let json = serde_json::to_string(&RecordLine {
            timestamp: Utc::now(),
            level: level.as_str(),
            record,
        })?;

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }
}

/// Make `log` the destination of every `ErrorRecord::log_*` call.
///
/// Only one record log can be installed per process.
pub fn install_record_log(log: RecordLog) -> Result<(), RecordError> {
    RECORD_LOG
        .set(log)
        .map_err(|_| RecordError::SubscriberInit("record log already installed".into()))
}

/// Write `record` to the installed record log. Does nothing before
/// `install_record_log`.
pub(crate) fn append_record(level: Level, record: &ErrorRecord) -> Result<(), RecordError> {
    match RECORD_LOG.get() {
        Some(log) => log.append(level, record),
        None => Ok(()),
    }
}

/// Install the global subscriber and the record log: JSON lines to the log
/// file, optionally mirrored to stderr.
pub fn init(options: &LogOptions) -> Result<(), RecordError> {
    let file = open_log_file(&options.file)?;

    let filter =
        EnvFilter::try_new(&options.filter).map_err(|e| RecordError::InvalidFilter {
            filter: options.filter.clone(),
            reason: e.to_string(),
        })?;

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter_fn(|meta| meta.target() != RECORD_TARGET));

    let stderr_layer = options.mirror_stderr.then(|| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| RecordError::SubscriberInit(e.to_string()))?;

    install_record_log(RecordLog::open(&options.file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LifecycleEvent;
    use tempfile::tempdir;

    #[test]
    fn open_creates_missing_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("kubinka.log");

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "first").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn reopen_appends_instead_of_truncating() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kubinka.log");

        {
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "run one").unwrap();
        }
        {
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "run two").unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["run one", "run two"]);
    }

    #[test]
    fn open_into_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let result = open_log_file(blocker.join("kubinka.log"));
        assert!(matches!(result, Err(RecordError::OpenFailed { .. })));
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn record_log_writes_one_object_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kubinka.log");
        let log = RecordLog::open(&path).unwrap();

        log.append(
            Level::INFO,
            &ErrorRecord::new(None)
                .event(LifecycleEvent::SessionShutdown)
                .set("cause", "execution stopped by user"),
        )
        .unwrap();
        log.append(
            Level::WARN,
            &ErrorRecord::from_message("nope").event(LifecycleEvent::ShutdownRoleDelete),
        )
        .unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_object());
        assert_eq!(lines[0]["event"], "session_shutdown");
        assert_eq!(lines[0]["cause"], "execution stopped by user");
        assert_eq!(lines[0]["level"], "INFO");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["event"], "shutdown_role_delete");
        assert_eq!(lines[1]["error"], "nope");
        assert_eq!(lines[1]["level"], "WARN");
    }

    // The only test in this crate that installs the process-wide record log.
    #[test]
    fn logged_record_lands_in_file_as_json_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kubinka.log");
        install_record_log(RecordLog::open(&path).unwrap()).unwrap();

        ErrorRecord::new(None)
            .event(LifecycleEvent::SessionShutdown)
            .set("cause", "x")
            .wrap(ErrorRecord::from_message("inner").event(LifecycleEvent::ShutdownStoreClose))
            .log_info();

        let lines = read_lines(&path);
        let line = lines
            .iter()
            .find(|v| v["event"] == "session_shutdown")
            .expect("record line");
        assert_eq!(line["cause"], "x");
        assert_eq!(line["wrapped"][0]["event"], "shutdown_store_close");
        assert!(line.get("fields").is_none());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let dir = tempdir().unwrap();
        let options = LogOptions {
            file: dir.path().join("kubinka.log"),
            filter: "kb_lifecycle=loudest".into(),
            mirror_stderr: false,
        };
        assert!(matches!(
            init(&options),
            Err(RecordError::InvalidFilter { .. })
        ));
    }
}
