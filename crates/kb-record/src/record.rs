// record.rs — ErrorRecord: the structured record used for logging and errors.
//
// A record is built incrementally with chained by-value calls and then
// treated as an immutable value:
//
//   ErrorRecord::from_error(&err)
//       .event(LifecycleEvent::StartupRoleReissue)
//       .set("session", member_id)
//
// Annotations keep their insertion order so the log line reads the way the
// record was built. Setting a key that already exists replaces its value in
// place.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::Level;

use crate::event::LifecycleEvent;
use crate::logging::{self, RECORD_TARGET};

/// Key used for the event annotation.
pub const EVENT_KEY: &str = "event";

/// A structured record: ordered annotations, an optional underlying error,
/// and wrapped records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorRecord {
    fields: Vec<(String, String)>,
    error: Option<String>,
    wrapped: Vec<ErrorRecord>,
}

impl ErrorRecord {
    /// Create a record from an optional underlying error.
    ///
    /// `None` produces a plain event record (startup, shutdown).
    pub fn new(err: Option<&dyn std::error::Error>) -> Self {
        Self {
            fields: Vec::new(),
            error: err.map(|e| e.to_string()),
            wrapped: Vec::new(),
        }
    }

    /// Create a record wrapping a concrete error.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self {
            fields: Vec::new(),
            error: Some(err.to_string()),
            wrapped: Vec::new(),
        }
    }

    /// Create a record from an error message that has no error type.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            error: Some(message.into()),
            wrapped: Vec::new(),
        }
    }

    /// Set an annotation and return self (builder pattern).
    pub fn set(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
        self
    }

    /// Set the `event` annotation.
    pub fn event(self, event: LifecycleEvent) -> Self {
        self.set(EVENT_KEY, event)
    }

    /// Attach another record underneath this one.
    pub fn wrap(mut self, other: impl Into<ErrorRecord>) -> Self {
        self.wrapped.push(other.into());
        self
    }

    /// Look up an annotation by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `event` annotation, if set.
    pub fn event_name(&self) -> Option<&str> {
        self.get(EVENT_KEY)
    }

    /// The underlying error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records wrapped underneath this one, in wrap order.
    pub fn wrapped(&self) -> &[ErrorRecord] {
        &self.wrapped
    }

    /// Annotations in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when the record carries an error, directly or in a wrapped record.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || self.wrapped.iter().any(ErrorRecord::has_error)
    }

    /// Serialize to a single-line JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }

    /// Write this record to the log file at info level.
    pub fn log_info(&self) {
        self.emit(Level::INFO);
        tracing::info!(target: RECORD_TARGET, "{}: {}", self.label(), self);
    }

    /// Write this record to the log file at warn level.
    pub fn log_warn(&self) {
        self.emit(Level::WARN);
        tracing::warn!(target: RECORD_TARGET, "{}: {}", self.label(), self);
    }

    /// Write this record to the log file at error level.
    pub fn log_error(&self) {
        self.emit(Level::ERROR);
        tracing::error!(target: RECORD_TARGET, "{}: {}", self.label(), self);
    }

    fn emit(&self, level: Level) {
        if let Err(e) = logging::append_record(level, self) {
            tracing::warn!(error = %e, event = self.label(), "record not written to log file");
        }
    }

    fn label(&self) -> &str {
        self.event_name().unwrap_or("record")
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.fields {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", k, v)?;
            first = false;
        }
        if let Some(err) = &self.error {
            if !first {
                f.write_str(": ")?;
            }
            f.write_str(err)?;
        }
        if !self.wrapped.is_empty() {
            f.write_str(" [")?;
            for (i, inner) in self.wrapped.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{}", inner)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {}

// Annotations serialize as top-level keys of one JSON object; `RecordLog`
// writes that object as its own line, so `jq .event` reads it from the log
// file. The error and wrapped records use reserved keys after them.
impl Serialize for ErrorRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.error.is_some()) + usize::from(!self.wrapped.is_empty());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        if let Some(err) = &self.error {
            map.serialize_entry("error", err)?;
        }
        if !self.wrapped.is_empty() {
            map.serialize_entry("wrapped", &self.wrapped)?;
        }
        map.end()
    }
}
