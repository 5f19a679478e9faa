//! # kb-record
//!
//! Structured lifecycle records for kubinka.
//!
//! Every lifecycle event (startup, shutdown, each fatal or non-fatal failure)
//! is described by an [`ErrorRecord`]: an ordered set of key/value
//! annotations, an optional underlying error, and any number of wrapped
//! records. The same value is used to propagate errors and to log them, so
//! nothing reaches the log file without at least an `event` annotation.
//!
//! ## Quick Example
//!
//! ```rust
//! use kb_record::{ErrorRecord, LifecycleEvent};
//!
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
//! let record = ErrorRecord::from_error(&err)
//!     .event(LifecycleEvent::StartupRoleReissue)
//!     .set("session", "1234");
//! assert_eq!(record.get("session"), Some("1234"));
//! ```

pub mod error;
pub mod event;
pub mod logging;
pub mod record;

pub use error::RecordError;
pub use event::LifecycleEvent;
pub use logging::{install_record_log, open_log_file, LogOptions, RecordLog, RECORD_TARGET};
pub use record::ErrorRecord;
