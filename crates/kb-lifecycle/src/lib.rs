//! # kb-lifecycle
//!
//! Startup provisioning, shared cancellation, and ordered shutdown for the
//! kubinka bot.
//!
//! A run goes through five states:
//!
//! ```text
//! Starting -> Provisioning -> Running -> ShuttingDown -> Stopped
//! ```
//!
//! - **Provisioning** opens the platform connection, creates the guild
//!   commands (all or nothing, fatal on failure), creates and configures the
//!   role (non-fatal), and re-grants it to every member with a stored record
//!   (non-fatal).
//! - **Running** waits on a single `select!` over SIGINT/SIGTERM and the
//!   [`ShutdownSignal`]. The expiration watcher runs alongside and fires the
//!   signal if it fails.
//! - **ShuttingDown** joins the watcher and unwinds the
//!   [`CompensationStack`] newest first: role delete, command delete,
//!   dispatcher halt, connection close, store close.
//!
//! Every step that fails is reported as a [`kb_record::ErrorRecord`] with an
//! `event` annotation before it is logged or returned.

pub mod commands;
pub mod compensation;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod role;
pub mod session;
pub mod signal;
pub mod state;
pub mod watcher;

pub use commands::CommandProvisioner;
pub use compensation::{CompensationStack, UnwindReport};
pub use config::KubinkaConfig;
pub use coordinator::{os_interrupt, InterruptKind, ShutdownCoordinator, ShutdownTrigger};
pub use dispatcher::{Dispatcher, InboundHandler, LoggingHandler};
pub use error::LifecycleError;
pub use orchestrator::{LifecycleSettings, Orchestrator, ShutdownReport};
pub use role::{RoleOutcome, RoleProvisioner, RoleReissuer, RoleSpec};
pub use session::Session;
pub use signal::{ShutdownSignal, CAUSE_FATAL_STARTUP, CAUSE_SESSION_SHUTDOWN, CAUSE_USER_STOP};
pub use state::LifecycleState;
pub use watcher::{ExpirationWatcherBridge, CAUSE_WATCHER_FAILED};
