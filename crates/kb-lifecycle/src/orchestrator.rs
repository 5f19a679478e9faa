// orchestrator.rs — Orchestrator: one full process run.
//
// Startup acquires resources in a fixed order and registers the undo action
// for each one the moment it exists:
//
//   store (connected by the caller)  -> store_close
//   platform connection              -> connector_close, dispatcher_halt
//   guild commands                   -> delete_commands
//   role                             -> delete_role
//
// Reissue and the expiration watcher acquire nothing that needs undoing.
// Shutdown joins the watcher, then unwinds the stack newest first, whatever
// ended the running state. A fatal startup error unwinds whatever had been
// registered up to that point and returns `LifecycleError::Fatal`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kb_platform::{CommandDefinition, Platform};
use kb_record::{ErrorRecord, LifecycleEvent};
use kb_store::{PlayerStore, WatchTarget};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::commands::CommandProvisioner;
use crate::compensation::{CompensationStack, UnwindReport};
use crate::coordinator::{InterruptKind, ShutdownCoordinator, ShutdownTrigger};
use crate::dispatcher::{Dispatcher, InboundHandler};
use crate::error::LifecycleError;
use crate::role::{RoleProvisioner, RoleReissuer, RoleSpec};
use crate::session::Session;
use crate::signal::{ShutdownSignal, CAUSE_FATAL_STARTUP, CAUSE_SESSION_SHUTDOWN};
use crate::state::LifecycleState;
use crate::watcher::ExpirationWatcherBridge;

/// What a run provisions and where.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub application_id: String,
    pub guild_id: String,
    /// Created in order; must not be empty.
    pub commands: Vec<CommandDefinition>,
    pub role: RoleSpec,
    /// Interval between expiration sweeps.
    pub poll_interval: Duration,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub session_id: Uuid,
    pub trigger: ShutdownTrigger,
    /// Cause carried by the shutdown signal.
    pub cause: String,
    /// Role that existed during the run, if any.
    pub role_id: Option<String>,
    /// Non-fatal startup failures (role create/edit, reissue).
    pub startup_errors: Vec<ErrorRecord>,
    /// Set when the expiration watcher ended with an error.
    pub watcher_error: Option<ErrorRecord>,
    pub unwind: UnwindReport,
    /// The `session_shutdown` record written to the log.
    pub record: ErrorRecord,
}

pub struct Orchestrator {
    platform: Arc<dyn Platform>,
    store: Arc<dyn PlayerStore>,
    handler: Arc<dyn InboundHandler>,
    settings: LifecycleSettings,
}

impl Orchestrator {
    /// `store` must already be connected; the run takes over closing it.
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn PlayerStore>,
        handler: Arc<dyn InboundHandler>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            platform,
            store,
            handler,
            settings,
        }
    }

    /// Provision, wait for a shutdown trigger, then undo everything.
    ///
    /// `interrupt` resolves when the process is asked to stop. See
    /// [`crate::coordinator::os_interrupt`].
    pub async fn run<I>(self, interrupt: I) -> Result<ShutdownReport, LifecycleError>
    where
        I: Future<Output = InterruptKind>,
    {
        let signal = ShutdownSignal::new();
        let mut session = Session::new(signal.clone());
        let mut stack = CompensationStack::new();
        let mut startup_errors = Vec::new();

        ErrorRecord::new(None)
            .event(LifecycleEvent::SessionStartup)
            .set("session_id", session.id)
            .set("platform", self.platform.name())
            .log_info();

        let store = Arc::clone(&self.store);
        stack.push("store_close", move || async move {
            store.close().map_err(|e| {
                ErrorRecord::from_error(&e).event(LifecycleEvent::ShutdownStoreClose)
            })
        });

        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.handler), signal.clone()));
        self.platform.register_handler(dispatcher.clone());

        // Connection
        match self.platform.open().await {
            Ok(user) => session.bot_user = Some(user),
            Err(e) => {
                let record = ErrorRecord::from_error(&e)
                    .event(LifecycleEvent::StartupConnectorOpen)
                    .set("platform", self.platform.name());
                return Err(abort(session, stack, record).await);
            }
        }
        let platform = Arc::clone(&self.platform);
        stack.push("connector_close", move || async move {
            platform.close().await.map_err(|e| {
                ErrorRecord::from_error(&e).event(LifecycleEvent::ShutdownConnectorClose)
            })
        });
        stack.push("dispatcher_halt", move || async move {
            dispatcher.halt_until_all_done().await;
            Ok(())
        });
        session.advance(LifecycleState::Provisioning);

        // Commands
        let commands = CommandProvisioner::new(
            Arc::clone(&self.platform),
            &self.settings.application_id,
            &self.settings.guild_id,
        );
        let provisioned = commands.provision(self.settings.commands.clone()).await;
        match provisioned {
            Ok(mut created) => stack.push("delete_commands", move || async move {
                commands
                    .delete_all(&mut created)
                    .await
                    .map_err(|r| r.event(LifecycleEvent::ShutdownCommandDelete))
            }),
            Err(record) => return Err(abort(session, stack, record).await),
        }

        // Role
        let outcome = RoleProvisioner::new(Arc::clone(&self.platform), &self.settings.guild_id)
            .provision(&self.settings.role)
            .await;
        if let Some(role_id) = outcome.role_id() {
            let platform = Arc::clone(&self.platform);
            let guild_id = self.settings.guild_id.clone();
            let role = role_id.to_string();
            stack.push("delete_role", move || async move {
                platform.delete_role(&guild_id, &role).await.map_err(|e| {
                    ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::ShutdownRoleDelete)
                        .set("role_id", &role)
                })
            });
            session.role_id = Some(role_id.to_string());
        }
        if let Some(error) = outcome.error() {
            error.log_warn();
            startup_errors.push(error.clone());
        }

        // Reissue
        if let Some(role_id) = &session.role_id {
            let reissuer = RoleReissuer::new(
                Arc::clone(&self.platform),
                &self.settings.guild_id,
                session.id.to_string(),
            );
            if let Err(error) = reissuer.reissue(self.store.as_ref(), role_id).await {
                error.log_warn();
                startup_errors.push(error);
            }
        }
        session.advance(LifecycleState::Running);

        let watcher = ExpirationWatcherBridge::spawn(
            Arc::clone(&self.store),
            Arc::clone(&self.platform),
            signal.clone(),
            WatchTarget {
                guild_id: self.settings.guild_id.clone(),
                role_id: session.role_id.clone(),
                poll_interval: self.settings.poll_interval,
            },
        );

        let trigger = ShutdownCoordinator::new(signal.clone()).wait(interrupt).await;
        session.advance(LifecycleState::ShuttingDown);
        signal.fire(CAUSE_SESSION_SHUTDOWN);

        let watcher_error = join_watcher(watcher).await;
        let unwind = stack.unwind().await;
        session.advance(LifecycleState::Stopped);

        let cause = signal.cause().unwrap_or(CAUSE_SESSION_SHUTDOWN).to_string();
        let record = startup_errors
            .iter()
            .cloned()
            .chain(watcher_error.clone())
            .chain(unwind.failures.iter().cloned())
            .fold(
                ErrorRecord::new(None)
                    .event(LifecycleEvent::SessionShutdown)
                    .set("session_id", session.id)
                    .set("cause", &cause)
                    .set("trigger", trigger),
                |record, wrapped| record.wrap(wrapped),
            );
        if record.has_error() {
            record.log_warn();
        } else {
            record.log_info();
        }

        Ok(ShutdownReport {
            session_id: session.id,
            trigger,
            cause,
            role_id: session.role_id,
            startup_errors,
            watcher_error,
            unwind,
            record,
        })
    }
}

/// Wait for the watcher task and collect its terminal record.
async fn join_watcher(watcher: JoinHandle<Option<ErrorRecord>>) -> Option<ErrorRecord> {
    match watcher.await {
        Ok(record) => record,
        Err(e) => {
            let record = ErrorRecord::from_error(&e).event(LifecycleEvent::ShutdownWatcherJoin);
            record.log_error();
            Some(record)
        }
    }
}

/// Fatal startup path: log, fire the signal, undo what was registered.
async fn abort(mut session: Session, mut stack: CompensationStack, fatal: ErrorRecord) -> LifecycleError {
    let fatal = fatal.set("state", session.state());
    fatal.log_error();
    session.signal.fire(CAUSE_FATAL_STARTUP);
    session.advance(LifecycleState::ShuttingDown);

    let unwind = stack.unwind().await;
    session.advance(LifecycleState::Stopped);

    unwind
        .failures
        .into_iter()
        .fold(
            ErrorRecord::new(None)
                .event(LifecycleEvent::SessionShutdown)
                .set("session_id", session.id)
                .set("cause", CAUSE_FATAL_STARTUP)
                .wrap(fatal.clone()),
            |record, failure| record.wrap(failure),
        )
        .log_warn();

    LifecycleError::Fatal { record: fatal }
}
