// mock.rs — In-memory Platform that records every call.
//
// Used by the lifecycle tests and by `kubinka --dry-run`. Every call is
// appended to the call log before failure injection is consulted, so a
// failing call is still visible to assertions.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::platform::{EventHandler, Platform};
use crate::types::{BotUser, CommandDefinition, PlatformEvent, Role, RoleParams};

/// Permission bitmask the mock assigns to new roles.
pub const DEFAULT_ROLE_PERMISSIONS: &str = "104324673";

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Open,
    Close,
    CreateCommand { name: String },
    DeleteCommand { command_id: String },
    CreateRole,
    EditRole { role_id: String },
    DeleteRole { role_id: String },
    AddMemberRole { member_id: String, role_id: String },
    RemoveMemberRole { member_id: String, role_id: String },
}

#[derive(Default)]
struct Failures {
    open: bool,
    close: bool,
    create_command: HashSet<String>,
    delete_command: HashSet<String>,
    create_role: bool,
    edit_role: bool,
    delete_role: bool,
    add_member_role: HashSet<String>,
    remove_member_role: HashSet<String>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<PlatformCall>,
    open: bool,
    next_id: u64,
    commands: BTreeMap<String, CommandDefinition>,
    roles: BTreeMap<String, Role>,
    member_roles: BTreeSet<(String, String)>,
    /// Members no longer in the guild.
    departed: HashSet<String>,
    handler: Option<Arc<dyn EventHandler>>,
    failures: Failures,
}

impl MockState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 900_000 + self.next_id)
    }
}

/// In-memory [`Platform`] with per-operation failure injection.
pub struct MockPlatform {
    user: BotUser,
    state: Mutex<MockState>,
}

fn injected(op: &str) -> PlatformError {
    PlatformError::Rejected(format!("injected {} failure", op))
}

fn unknown_member() -> PlatformError {
    PlatformError::Api {
        status: 404,
        message: "Unknown Member".into(),
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            user: BotUser {
                id: "100000".into(),
                username: "kubinka".into(),
            },
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── failure injection ──────────────────────────────────────────

    pub fn fail_open(&self) {
        self.state().failures.open = true;
    }

    pub fn fail_close(&self) {
        self.state().failures.close = true;
    }

    /// Fail creation of the command with this name.
    pub fn fail_create_command(&self, name: &str) {
        self.state().failures.create_command.insert(name.to_string());
    }

    /// Fail deletion of the command with this name.
    pub fn fail_delete_command(&self, name: &str) {
        self.state().failures.delete_command.insert(name.to_string());
    }

    pub fn fail_create_role(&self) {
        self.state().failures.create_role = true;
    }

    pub fn fail_edit_role(&self) {
        self.state().failures.edit_role = true;
    }

    pub fn fail_delete_role(&self) {
        self.state().failures.delete_role = true;
    }

    /// Fail granting any role to this member.
    pub fn fail_add_member_role(&self, member_id: &str) {
        self.state()
            .failures
            .add_member_role
            .insert(member_id.to_string());
    }

    /// Fail revoking any role from this member.
    pub fn fail_remove_member_role(&self, member_id: &str) {
        self.state()
            .failures
            .remove_member_role
            .insert(member_id.to_string());
    }

    /// The member leaves the guild: their roles go with them and later
    /// member-role calls answer 404.
    pub fn member_left(&self, member_id: &str) {
        let mut state = self.state();
        state.member_roles.retain(|(member, _)| member != member_id);
        state.departed.insert(member_id.to_string());
    }

    // ── inspection ─────────────────────────────────────────────────

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    /// Commands that currently exist, by name.
    pub fn live_commands(&self) -> Vec<String> {
        self.state()
            .commands
            .values()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Roles that currently exist.
    pub fn live_roles(&self) -> Vec<Role> {
        self.state().roles.values().cloned().collect()
    }

    pub fn member_has_role(&self, member_id: &str, role_id: &str) -> bool {
        self.state()
            .member_roles
            .contains(&(member_id.to_string(), role_id.to_string()))
    }

    /// Deliver an inbound event to the registered handler, if any.
    pub async fn deliver(&self, event: PlatformEvent) -> bool {
        let handler = self.state().handler.clone();
        match handler {
            Some(handler) => {
                handler.handle(event).await;
                true
            }
            None => false,
        }
    }

    fn record(&self, call: PlatformCall) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        self.state().handler = Some(handler);
    }

    async fn open(&self) -> Result<BotUser, PlatformError> {
        {
            let mut state = self.record(PlatformCall::Open);
            if state.failures.open {
                return Err(injected("open"));
            }
            state.open = true;
        }
        Ok(self.user.clone())
    }

    async fn close(&self) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::Close);
        if state.failures.close {
            return Err(injected("close"));
        }
        if !state.open {
            return Err(PlatformError::NotOpen);
        }
        state.open = false;
        Ok(())
    }

    async fn create_command(
        &self,
        _application_id: &str,
        _guild_id: &str,
        def: &CommandDefinition,
    ) -> Result<CommandDefinition, PlatformError> {
        let mut state = self.record(PlatformCall::CreateCommand {
            name: def.name.clone(),
        });
        if !state.open {
            return Err(PlatformError::NotOpen);
        }
        if state.failures.create_command.contains(&def.name) {
            return Err(injected("create_command"));
        }
        let id = state.next_id();
        let created = CommandDefinition {
            id: Some(id.clone()),
            ..def.clone()
        };
        state.commands.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_command(
        &self,
        _application_id: &str,
        _guild_id: &str,
        command_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::DeleteCommand {
            command_id: command_id.to_string(),
        });
        let name = match state.commands.get(command_id) {
            Some(cmd) => cmd.name.clone(),
            None => {
                return Err(PlatformError::Api {
                    status: 404,
                    message: format!("unknown command {}", command_id),
                })
            }
        };
        if state.failures.delete_command.contains(&name) {
            return Err(injected("delete_command"));
        }
        state.commands.remove(command_id);
        Ok(())
    }

    async fn create_role(&self, _guild_id: &str) -> Result<Role, PlatformError> {
        let mut state = self.record(PlatformCall::CreateRole);
        if !state.open {
            return Err(PlatformError::NotOpen);
        }
        if state.failures.create_role {
            return Err(injected("create_role"));
        }
        let id = state.next_id();
        let role = Role {
            id: id.clone(),
            name: "new role".into(),
            color: 0,
            hoist: false,
            permissions: DEFAULT_ROLE_PERMISSIONS.into(),
            mentionable: false,
        };
        state.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn edit_role(
        &self,
        _guild_id: &str,
        role_id: &str,
        params: &RoleParams,
    ) -> Result<Role, PlatformError> {
        let mut state = self.record(PlatformCall::EditRole {
            role_id: role_id.to_string(),
        });
        if state.failures.edit_role {
            return Err(injected("edit_role"));
        }
        let role = state
            .roles
            .get_mut(role_id)
            .ok_or_else(|| PlatformError::Api {
                status: 404,
                message: format!("unknown role {}", role_id),
            })?;
        role.name = params.name.clone();
        role.color = params.color;
        role.hoist = params.hoist;
        role.permissions = params.permissions.clone();
        role.mentionable = params.mentionable;
        Ok(role.clone())
    }

    async fn delete_role(&self, _guild_id: &str, role_id: &str) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::DeleteRole {
            role_id: role_id.to_string(),
        });
        if state.failures.delete_role {
            return Err(injected("delete_role"));
        }
        if state.roles.remove(role_id).is_none() {
            return Err(PlatformError::Api {
                status: 404,
                message: format!("unknown role {}", role_id),
            });
        }
        state.member_roles.retain(|(_, r)| r != role_id);
        Ok(())
    }

    async fn add_member_role(
        &self,
        _guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::AddMemberRole {
            member_id: member_id.to_string(),
            role_id: role_id.to_string(),
        });
        if state.failures.add_member_role.contains(member_id) {
            return Err(injected("add_member_role"));
        }
        if state.departed.contains(member_id) {
            return Err(unknown_member());
        }
        state
            .member_roles
            .insert((member_id.to_string(), role_id.to_string()));
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::RemoveMemberRole {
            member_id: member_id.to_string(),
            role_id: role_id.to_string(),
        });
        if state.failures.remove_member_role.contains(member_id) {
            return Err(injected("remove_member_role"));
        }
        if state.departed.contains(member_id) {
            return Err(unknown_member());
        }
        state
            .member_roles
            .remove(&(member_id.to_string(), role_id.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
