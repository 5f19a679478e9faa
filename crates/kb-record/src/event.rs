// event.rs — Lifecycle event vocabulary.
//
// Every record carries an `event` annotation naming what happened. Keeping
// the names in one enum means a typo can't split one event into two in the
// log file.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `event` annotation values written by the lifecycle layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The process started.
    SessionStartup,
    /// The process finished its compensation chain.
    SessionShutdown,
    /// The player store could not be opened.
    StartupStoreConnect,
    /// The platform connection could not be opened.
    StartupConnectorOpen,
    /// A command definition could not be created.
    StartupCommandCreate,
    /// Rolling back already-created commands failed mid-startup.
    StartupCommandRollback,
    /// The role could not be created.
    StartupRoleCreate,
    /// The role was created but could not be configured.
    StartupRoleEdit,
    /// Re-granting the role to a known record holder failed.
    StartupRoleReissue,
    /// Deleting the role at shutdown failed.
    ShutdownRoleDelete,
    /// Deleting commands at shutdown failed.
    ShutdownCommandDelete,
    /// Closing the platform connection failed.
    ShutdownConnectorClose,
    /// Closing the store failed.
    ShutdownStoreClose,
    /// The expiration watcher did not stop cleanly.
    ShutdownWatcherJoin,
    /// The expiration watcher stopped with an unrecoverable error.
    WatcherTerminated,
    /// Revoking the role from an expired record holder failed.
    ExpirationRevoke,
    /// An inbound command invocation was received.
    CommandInvoked,
}

impl LifecycleEvent {
    /// The snake_case name written to the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::SessionStartup => "session_startup",
            LifecycleEvent::SessionShutdown => "session_shutdown",
            LifecycleEvent::StartupStoreConnect => "startup_store_connect",
            LifecycleEvent::StartupConnectorOpen => "startup_connector_open",
            LifecycleEvent::StartupCommandCreate => "startup_command_create",
            LifecycleEvent::StartupCommandRollback => "startup_command_rollback",
            LifecycleEvent::StartupRoleCreate => "startup_role_create",
            LifecycleEvent::StartupRoleEdit => "startup_role_edit",
            LifecycleEvent::StartupRoleReissue => "startup_role_reissue",
            LifecycleEvent::ShutdownRoleDelete => "shutdown_role_delete",
            LifecycleEvent::ShutdownCommandDelete => "shutdown_command_delete",
            LifecycleEvent::ShutdownConnectorClose => "shutdown_connector_close",
            LifecycleEvent::ShutdownStoreClose => "shutdown_store_close",
            LifecycleEvent::ShutdownWatcherJoin => "shutdown_watcher_join",
            LifecycleEvent::WatcherTerminated => "watcher_terminated",
            LifecycleEvent::ExpirationRevoke => "expiration_revoke",
            LifecycleEvent::CommandInvoked => "command_invoked",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
