// platform.rs — The Platform and EventHandler traits.
//
// The lifecycle layer is written against these traits only. Every call is a
// single remote side effect; implementations bring their own timeouts, the
// caller applies none.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::{BotUser, CommandDefinition, PlatformEvent, Role, RoleParams};

/// Receives inbound platform events.
///
/// Exactly one handler is registered per connection.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: PlatformEvent);
}

/// A connection to the messaging platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Register the inbound event handler. Must be called before `open`.
    fn register_handler(&self, handler: Arc<dyn EventHandler>);

    /// Open the connection and return the authenticated identity.
    async fn open(&self) -> Result<BotUser, PlatformError>;

    /// Close the connection. Later calls fail with `NotOpen`.
    async fn close(&self) -> Result<(), PlatformError>;

    /// Create a guild command and return it with its remote id populated.
    async fn create_command(
        &self,
        application_id: &str,
        guild_id: &str,
        def: &CommandDefinition,
    ) -> Result<CommandDefinition, PlatformError>;

    /// Delete a guild command by remote id.
    async fn delete_command(
        &self,
        application_id: &str,
        guild_id: &str,
        command_id: &str,
    ) -> Result<(), PlatformError>;

    /// Create a role with platform defaults.
    async fn create_role(&self, guild_id: &str) -> Result<Role, PlatformError>;

    /// Overwrite a role's name, color, flags and permissions.
    async fn edit_role(
        &self,
        guild_id: &str,
        role_id: &str,
        params: &RoleParams,
    ) -> Result<Role, PlatformError>;

    async fn delete_role(&self, guild_id: &str, role_id: &str) -> Result<(), PlatformError>;

    /// Grant a role to a guild member.
    async fn add_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    /// Revoke a role from a guild member.
    async fn remove_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    /// Implementation name for log output.
    fn name(&self) -> &str;
}
