// types.rs — Data exchanged with the messaging platform.

use serde::{Deserialize, Serialize};

/// A guild command definition.
///
/// `id` is `None` until the command exists on the platform, and is cleared
/// again once it has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Command name as typed by members (e.g. `deploy`).
    pub name: String,

    /// Help text shown by the platform.
    pub description: String,

    /// Remote identifier, populated by creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            id: None,
        }
    }

    /// Whether this definition currently exists on the platform.
    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }
}

/// A guild role as reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub color: u32,

    /// Display members with this role separately.
    #[serde(default)]
    pub hoist: bool,

    /// Permission bitmask, serialized as a decimal string.
    #[serde(default)]
    pub permissions: String,

    #[serde(default)]
    pub mentionable: bool,
}

/// Fields written by a role edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleParams {
    pub name: String,
    pub color: u32,
    pub hoist: bool,
    pub permissions: String,
    pub mentionable: bool,
}

/// The identity the connection is authenticated as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// Inbound events delivered to the registered handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// The connection is open and authenticated.
    Ready { user: BotUser },

    /// A member invoked one of our guild commands.
    CommandInvocation {
        command: String,
        guild_id: String,
        member_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_command_is_not_created() {
        let def = CommandDefinition::new("deploy", "Queue for deployment");
        assert!(!def.is_created());
        let json = serde_json::to_string(&def).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn role_parses_platform_payload() {
        let json = r#"{"id":"42","name":"new role","color":0,"hoist":false,
            "permissions":"104324673","mentionable":false,"position":3}"#;
        let role: Role = serde_json::from_str(json).unwrap();
        assert_eq!(role.id, "42");
        assert_eq!(role.permissions, "104324673");
    }

    #[test]
    fn event_is_tagged_by_type() {
        let event = PlatformEvent::CommandInvocation {
            command: "deploy".into(),
            guild_id: "g".into(),
            member_id: "m".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"command_invocation\""));
    }
}
