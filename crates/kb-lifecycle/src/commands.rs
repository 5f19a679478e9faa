// commands.rs — CommandProvisioner: all-or-nothing guild command registration.
//
// Commands are created in definition order. If creation fails part way, the
// commands already created are deleted again before the failure is returned,
// so a failed startup never leaves a partial command set on the platform.
// The same delete routine serves the shutdown compensation.

use std::sync::Arc;

use kb_platform::{CommandDefinition, Platform};
use kb_record::{ErrorRecord, LifecycleEvent};

/// Registers and removes the bot's guild commands.
#[derive(Clone)]
pub struct CommandProvisioner {
    platform: Arc<dyn Platform>,
    application_id: String,
    guild_id: String,
}

impl CommandProvisioner {
    pub fn new(
        platform: Arc<dyn Platform>,
        application_id: impl Into<String>,
        guild_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            application_id: application_id.into(),
            guild_id: guild_id.into(),
        }
    }

    /// Create every definition in order and return them with ids populated.
    ///
    /// On failure at index `i`, the commands at `[0, i)` are deleted before
    /// returning and nothing at or after `i` is attempted again. The error
    /// is a `startup_command_create` record naming the failing command, or a
    /// `startup_command_rollback` record wrapping it when the rollback
    /// itself failed. Both are fatal to startup.
    pub async fn provision(
        &self,
        defs: Vec<CommandDefinition>,
    ) -> Result<Vec<CommandDefinition>, ErrorRecord> {
        if defs.is_empty() {
            return Err(ErrorRecord::from_message("no command definitions configured")
                .event(LifecycleEvent::StartupCommandCreate));
        }

        let mut created: Vec<CommandDefinition> = Vec::with_capacity(defs.len());
        for def in defs {
            match self
                .platform
                .create_command(&self.application_id, &self.guild_id, &def)
                .await
            {
                Ok(remote) => {
                    tracing::info!(
                        command = %remote.name,
                        command_id = remote.id.as_deref().unwrap_or(""),
                        "command created"
                    );
                    created.push(remote);
                }
                Err(e) => {
                    let failure = ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::StartupCommandCreate)
                        .set("command", &def.name);
                    return Err(self.roll_back(&mut created, failure).await);
                }
            }
        }

        Ok(created)
    }

    /// Undo a partial provisioning run and return the record to report.
    async fn roll_back(&self, created: &mut [CommandDefinition], failure: ErrorRecord) -> ErrorRecord {
        if created.is_empty() {
            return failure;
        }
        match self.delete_all(created).await {
            Ok(()) => failure,
            Err(rollback) => rollback
                .event(LifecycleEvent::StartupCommandRollback)
                .wrap(failure),
        }
    }

    /// Delete every created command, clearing each id once it is gone.
    ///
    /// Every command is attempted even when an earlier delete fails. The
    /// returned record wraps one record per failed delete; the caller sets
    /// the event.
    pub async fn delete_all(&self, defs: &mut [CommandDefinition]) -> Result<(), ErrorRecord> {
        let mut failures = Vec::new();

        for def in defs.iter_mut() {
            let Some(id) = def.id.clone() else {
                continue;
            };
            match self
                .platform
                .delete_command(&self.application_id, &self.guild_id, &id)
                .await
            {
                Ok(()) => {
                    tracing::debug!(command = %def.name, command_id = %id, "command deleted");
                    def.id = None;
                }
                Err(e) => failures.push(
                    ErrorRecord::from_error(&e)
                        .set("command", &def.name)
                        .set("command_id", &id),
                ),
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        let count = failures.len();
        Err(failures.into_iter().fold(
            ErrorRecord::from_message(format!("{} command(s) could not be deleted", count)),
            |record, failure| record.wrap(failure),
        ))
    }
}
