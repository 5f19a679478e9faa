// role.rs — RoleProvisioner and RoleReissuer.
//
// The provisioner creates the bot's role and then edits it into shape. The
// platform assigns a permission bitmask on create; the edit writes it back
// unchanged while setting name, colour and the display flags.
//
// The reissuer grants the role to every member the store still holds a
// record for, recovering membership the platform forgot across a restart.

use std::sync::Arc;

use kb_platform::{Platform, Role, RoleParams};
use kb_record::{ErrorRecord, LifecycleEvent};
use kb_store::PlayerStore;

/// Name and colour of the role to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub color: u32,
}

/// Result of a provisioning attempt.
#[derive(Debug, Clone)]
pub enum RoleOutcome {
    /// Created and edited.
    Configured(Role),
    /// Created, but the edit failed. The role exists with the platform's
    /// default flags and must still be deleted at shutdown.
    Misconfigured { role_id: String, error: ErrorRecord },
    /// Creation failed; nothing exists.
    Failed(ErrorRecord),
}

impl RoleOutcome {
    /// Id of the role that now exists on the platform, if any.
    pub fn role_id(&self) -> Option<&str> {
        match self {
            RoleOutcome::Configured(role) => Some(&role.id),
            RoleOutcome::Misconfigured { role_id, .. } => Some(role_id),
            RoleOutcome::Failed(_) => None,
        }
    }

    /// The non-fatal startup error, if the attempt was not fully successful.
    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            RoleOutcome::Configured(_) => None,
            RoleOutcome::Misconfigured { error, .. } | RoleOutcome::Failed(error) => Some(error),
        }
    }
}

/// Creates and configures the bot's role.
pub struct RoleProvisioner {
    platform: Arc<dyn Platform>,
    guild_id: String,
}

impl RoleProvisioner {
    pub fn new(platform: Arc<dyn Platform>, guild_id: impl Into<String>) -> Self {
        Self {
            platform,
            guild_id: guild_id.into(),
        }
    }

    pub async fn provision(&self, spec: &RoleSpec) -> RoleOutcome {
        let created = match self.platform.create_role(&self.guild_id).await {
            Ok(role) => role,
            Err(e) => {
                return RoleOutcome::Failed(
                    ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::StartupRoleCreate)
                        .set("role", &spec.name),
                )
            }
        };

        let params = RoleParams {
            name: spec.name.clone(),
            color: spec.color,
            hoist: true,
            permissions: created.permissions.clone(),
            mentionable: true,
        };
        match self
            .platform
            .edit_role(&self.guild_id, &created.id, &params)
            .await
        {
            Ok(role) => {
                tracing::info!(role_id = %role.id, role = %role.name, "role provisioned");
                RoleOutcome::Configured(role)
            }
            Err(e) => RoleOutcome::Misconfigured {
                error: ErrorRecord::from_error(&e)
                    .event(LifecycleEvent::StartupRoleEdit)
                    .set("role", &spec.name)
                    .set("role_id", &created.id),
                role_id: created.id,
            },
        }
    }
}

/// Re-grants the role to every member with a stored record.
pub struct RoleReissuer {
    platform: Arc<dyn Platform>,
    guild_id: String,
    session_id: String,
}

impl RoleReissuer {
    pub fn new(
        platform: Arc<dyn Platform>,
        guild_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            guild_id: guild_id.into(),
            session_id: session_id.into(),
        }
    }

    /// Grant `role_id` to each stored member, in store order.
    ///
    /// Stops at the first failure. Grants made before it stay in place. The
    /// error names the failing member under `session`.
    pub async fn reissue(&self, store: &dyn PlayerStore, role_id: &str) -> Result<usize, ErrorRecord> {
        let ids = store.player_ids().map_err(|e| {
            ErrorRecord::from_error(&e)
                .event(LifecycleEvent::StartupRoleReissue)
                .set("session_id", &self.session_id)
        })?;

        let mut granted = 0;
        for member_id in &ids {
            self.platform
                .add_member_role(&self.guild_id, member_id, role_id)
                .await
                .map_err(|e| {
                    ErrorRecord::from_error(&e)
                        .event(LifecycleEvent::StartupRoleReissue)
                        .set("session", member_id)
                        .set("session_id", &self.session_id)
                })?;
            granted += 1;
        }

        tracing::info!(granted, role_id = %role_id, "role reissued");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kb_platform::mock::DEFAULT_ROLE_PERMISSIONS;
    use kb_platform::{MockPlatform, PlatformCall};
    use kb_store::{JsonPlayerStore, PlayerRecord};
    use tempfile::tempdir;

    fn spec() -> RoleSpec {
        RoleSpec {
            name: "Waiting deploy".into(),
            color: 307015,
        }
    }

    async fn open_mock() -> Arc<MockPlatform> {
        let platform = Arc::new(MockPlatform::new());
        platform.open().await.unwrap();
        platform
    }

    #[tokio::test]
    async fn provision_edits_flags_and_keeps_permissions() {
        let platform = open_mock().await;
        let outcome = RoleProvisioner::new(platform.clone(), "guild")
            .provision(&spec())
            .await;

        let RoleOutcome::Configured(role) = outcome else {
            panic!("expected configured role");
        };
        assert_eq!(role.name, "Waiting deploy");
        assert_eq!(role.color, 307015);
        assert!(role.hoist && role.mentionable);
        assert_eq!(role.permissions, DEFAULT_ROLE_PERMISSIONS);
    }

    #[tokio::test]
    async fn create_failure_leaves_no_role() {
        let platform = open_mock().await;
        platform.fail_create_role();

        let outcome = RoleProvisioner::new(platform.clone(), "guild")
            .provision(&spec())
            .await;

        assert!(outcome.role_id().is_none());
        assert_eq!(outcome.error().and_then(|e| e.event_name()), Some("startup_role_create"));
        assert!(platform.live_roles().is_empty());
        assert!(!platform
            .calls()
            .iter()
            .any(|c| matches!(c, PlatformCall::EditRole { .. })));
    }

    #[tokio::test]
    async fn edit_failure_keeps_the_role_id() {
        let platform = open_mock().await;
        platform.fail_edit_role();

        let outcome = RoleProvisioner::new(platform.clone(), "guild")
            .provision(&spec())
            .await;

        let live = platform.live_roles();
        assert_eq!(live.len(), 1);
        assert_eq!(outcome.role_id(), Some(live[0].id.as_str()));
        assert_eq!(outcome.error().and_then(|e| e.event_name()), Some("startup_role_edit"));
        assert!(!live[0].hoist);
    }

    #[tokio::test]
    async fn reissue_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        for id in ["A", "B", "C"] {
            store.save(&PlayerRecord::new(id, Duration::hours(1))).unwrap();
        }
        let platform = open_mock().await;
        let role = platform.create_role("guild").await.unwrap();
        platform.fail_add_member_role("B");

        let err = RoleReissuer::new(platform.clone(), "guild", "session-1")
            .reissue(&store, &role.id)
            .await
            .unwrap_err();

        let attempted: Vec<String> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::AddMemberRole { member_id, .. } => Some(member_id),
                _ => None,
            })
            .collect();
        assert_eq!(attempted, vec!["A", "B"]);
        assert_eq!(err.get("session"), Some("B"));
        assert_eq!(err.event_name(), Some("startup_role_reissue"));
        assert!(platform.member_has_role("A", &role.id));
        assert!(!platform.member_has_role("C", &role.id));
    }

    #[tokio::test]
    async fn reissue_grants_everyone() {
        let dir = tempdir().unwrap();
        let store = JsonPlayerStore::connect(dir.path(), "players").unwrap();
        for id in ["A", "B"] {
            store.save(&PlayerRecord::new(id, Duration::hours(1))).unwrap();
        }
        let platform = open_mock().await;
        let role = platform.create_role("guild").await.unwrap();

        let granted = RoleReissuer::new(platform.clone(), "guild", "s")
            .reissue(&store, &role.id)
            .await
            .unwrap();

        assert_eq!(granted, 2);
        assert!(platform.member_has_role("B", &role.id));
    }
}
