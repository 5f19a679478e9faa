// config.rs — KubinkaConfig: the process configuration file.
//
// Loaded from TOML. Every section except `[discord]` has defaults, so a
// minimal file only names the bot and the guild:
//
//   [discord]
//   token = "..."
//   application_id = "..."
//   guild_id = "..."

use std::path::{Path, PathBuf};
use std::time::Duration;

use kb_platform::CommandDefinition;
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::orchestrator::LifecycleSettings;
use crate::role::RoleSpec;

/// Environment variable that overrides `discord.token`.
pub const TOKEN_ENV_VAR: &str = "KUBINKA_BOT_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubinkaConfig {
    pub discord: DiscordConfig,

    #[serde(default)]
    pub role: RoleConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Guild commands, created in this order.
    #[serde(default = "default_commands")]
    pub commands: Vec<CommandConfig>,
}

/// Bot identity and target guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. May be left empty when supplied through the environment.
    #[serde(default)]
    pub token: String,

    pub application_id: String,

    pub guild_id: String,

    /// REST endpoint override.
    pub api_base: Option<String>,
}

/// The role granted to queued members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default = "default_role_name")]
    pub name: String,

    #[serde(default = "default_role_color")]
    pub color: u32,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            name: default_role_name(),
            color: default_role_color(),
        }
    }
}

/// Player record storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Seconds between expiration sweeps.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            bucket: default_bucket(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Log destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only log file, created if absent.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// `EnvFilter` directive, e.g. `info` or `kb_lifecycle=debug`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    pub name: String,
    pub description: String,
}

// Serde default functions
fn default_role_name() -> String {
    "Waiting deploy".to_string()
}

fn default_role_color() -> u32 {
    307015
}

fn default_store_path() -> PathBuf {
    PathBuf::from("kubinka.db")
}

fn default_bucket() -> String {
    "players".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_log_file() -> PathBuf {
    PathBuf::from("kubinka.log")
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_commands() -> Vec<CommandConfig> {
    vec![
        CommandConfig {
            name: "deploy".to_string(),
            description: "Queue for the next deployment".to_string(),
        },
        CommandConfig {
            name: "return".to_string(),
            description: "Leave the deployment queue".to_string(),
        },
    ]
}

impl KubinkaConfig {
    /// Load the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let content = std::fs::read_to_string(path).map_err(|source| LifecycleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, LifecycleError> {
        Ok(toml::from_str(content)?)
    }

    /// Replace the token with `value` when it is set and non-empty.
    pub fn apply_token_override(&mut self, value: Option<String>) {
        if let Some(token) = value.filter(|t| !t.trim().is_empty()) {
            self.discord.token = token;
        }
    }

    /// Apply `KUBINKA_BOT_TOKEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
    }

    /// Reject configurations that cannot start a run.
    ///
    /// `require_token` is false for dry runs, which never reach Discord.
    pub fn validate(&self, require_token: bool) -> Result<(), LifecycleError> {
        if require_token && self.discord.token.trim().is_empty() {
            return Err(LifecycleError::InvalidConfig(format!(
                "discord.token is empty and {} is not set",
                TOKEN_ENV_VAR
            )));
        }
        if self.discord.application_id.trim().is_empty() {
            return Err(LifecycleError::InvalidConfig("discord.application_id is empty".into()));
        }
        if self.discord.guild_id.trim().is_empty() {
            return Err(LifecycleError::InvalidConfig("discord.guild_id is empty".into()));
        }
        if self.commands.is_empty() {
            return Err(LifecycleError::InvalidConfig("at least one command is required".into()));
        }
        if let Some(cmd) = self.commands.iter().find(|c| c.name.trim().is_empty()) {
            return Err(LifecycleError::InvalidConfig(format!(
                "command with description {:?} has no name",
                cmd.description
            )));
        }
        if self.store.poll_interval_secs == 0 {
            return Err(LifecycleError::InvalidConfig("store.poll_interval_secs must be positive".into()));
        }
        Ok(())
    }

    /// The settings the orchestrator runs with.
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            application_id: self.discord.application_id.clone(),
            guild_id: self.discord.guild_id.clone(),
            commands: self
                .commands
                .iter()
                .map(|c| CommandDefinition::new(&c.name, &c.description))
                .collect(),
            role: RoleSpec {
                name: self.role.name.clone(),
                color: self.role.color,
            },
            poll_interval: Duration::from_secs(self.store.poll_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
[discord]
token = "file-token"
application_id = "app"
guild_id = "guild"
"#;

    #[test]
    fn minimal_file_gets_defaults() {
        let config = KubinkaConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.role.name, "Waiting deploy");
        assert_eq!(config.role.color, 307015);
        assert_eq!(config.store.bucket, "players");
        assert_eq!(config.log.file, PathBuf::from("kubinka.log"));
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.commands[0].name, "deploy");
        config.validate(true).unwrap();
    }

    #[test]
    fn explicit_commands_replace_defaults() {
        let content = format!(
            "{}\n[[commands]]\nname = \"queue\"\ndescription = \"Join\"\n",
            MINIMAL
        );
        let config = KubinkaConfig::parse(&content).unwrap();
        let settings = config.lifecycle_settings();
        assert_eq!(settings.commands, vec![CommandDefinition::new("queue", "Join")]);
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn empty_command_list_is_invalid() {
        let content = format!("commands = []\n{}", MINIMAL);
        let config = KubinkaConfig::parse(&content).unwrap();
        assert!(matches!(
            config.validate(true),
            Err(LifecycleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn token_override_wins_over_file() {
        let mut config = KubinkaConfig::parse(MINIMAL).unwrap();
        config.apply_token_override(Some("env-token".into()));
        assert_eq!(config.discord.token, "env-token");

        config.apply_token_override(Some("  ".into()));
        config.apply_token_override(None);
        assert_eq!(config.discord.token, "env-token");
    }

    #[test]
    fn missing_token_only_matters_when_required() {
        let content = MINIMAL.replace("token = \"file-token\"\n", "");
        let config = KubinkaConfig::parse(&content).unwrap();
        assert!(config.validate(true).is_err());
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = KubinkaConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, LifecycleError::ConfigRead { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kubinka.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = KubinkaConfig::load(&path).unwrap();
        assert_eq!(config.discord.guild_id, "guild");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            KubinkaConfig::parse("[discord"),
            Err(LifecycleError::ConfigParse(_))
        ));
    }
}
