//! # kb-platform
//!
//! The messaging-platform boundary for kubinka.
//!
//! The lifecycle layer only talks to the platform through the [`Platform`]
//! trait: open/close the connection, create and delete guild commands,
//! create/edit/delete one role, and grant or revoke that role on members.
//! Inbound events are delivered to a single registered [`EventHandler`].
//!
//! Two implementations ship with the crate:
//!
//! - [`DiscordClient`]: Discord REST API over `reqwest`
//! - [`MockPlatform`]: in-memory, records every call, failures can be
//!   injected per operation; used by tests and `--dry-run`

pub mod discord;
pub mod error;
pub mod mock;
pub mod platform;
pub mod types;

pub use discord::DiscordClient;
pub use error::PlatformError;
pub use mock::{MockPlatform, PlatformCall};
pub use platform::{EventHandler, Platform};
pub use types::{BotUser, CommandDefinition, PlatformEvent, Role, RoleParams};
