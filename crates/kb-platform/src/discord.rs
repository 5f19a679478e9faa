// discord.rs — Discord REST implementation of the Platform trait.
//
// Covers the provisioning surface only: identity lookup, guild commands,
// roles and member roles. Gateway delivery of inbound events belongs to the
// websocket client and is not part of this crate; `open()` hands the
// registered handler a `Ready` event once the identity is known.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PlatformError;
use crate::platform::{EventHandler, Platform};
use crate::types::{BotUser, CommandDefinition, PlatformEvent, Role, RoleParams};

/// Default REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Discord REST client authenticated as a bot.
pub struct DiscordClient {
    http: Client,
    token: String,
    api_base: String,
    inner: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    user: Option<BotUser>,
    handler: Option<Arc<dyn EventHandler>>,
}

/// Error body Discord sends with 4xx responses.
#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Command payload as Discord returns it.
#[derive(Deserialize)]
struct CommandBody {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

impl DiscordClient {
    /// Create a client for the given bot token.
    ///
    /// `api_base` overrides [`DEFAULT_API_BASE`] (useful for a local proxy).
    pub fn new(token: impl Into<String>, api_base: Option<String>) -> Result<Self, PlatformError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            token: token.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            inner: Mutex::new(ClientState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_open(&self) -> Result<(), PlatformError> {
        if self.state().user.is_some() {
            Ok(())
        } else {
            Err(PlatformError::NotOpen)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.token))
    }

    /// Turn a non-success response into `PlatformError::Api`.
    async fn check(response: Response) -> Result<Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        Err(PlatformError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PlatformError> {
        let response = Self::check(self.authorized(request).send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), PlatformError> {
        Self::check(self.authorized(request).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl Platform for DiscordClient {
    fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        self.state().handler = Some(handler);
    }

    async fn open(&self) -> Result<BotUser, PlatformError> {
        let user: BotUser = self.send_json(self.http.get(self.url("/users/@me"))).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "discord connection open");

        let handler = {
            let mut state = self.state();
            state.user = Some(user.clone());
            state.handler.clone()
        };
        if let Some(handler) = handler {
            handler.handle(PlatformEvent::Ready { user: user.clone() }).await;
        }
        Ok(user)
    }

    async fn close(&self) -> Result<(), PlatformError> {
        let mut state = self.state();
        if state.user.take().is_none() {
            return Err(PlatformError::NotOpen);
        }
        state.handler = None;
        Ok(())
    }

    async fn create_command(
        &self,
        application_id: &str,
        guild_id: &str,
        def: &CommandDefinition,
    ) -> Result<CommandDefinition, PlatformError> {
        self.ensure_open()?;
        let payload = serde_json::json!({
            "name": def.name,
            "description": def.description,
            "type": 1,
        });
        let url = self.url(&format!(
            "/applications/{}/guilds/{}/commands",
            application_id, guild_id
        ));
        let body: CommandBody = self.send_json(self.http.post(url).json(&payload)).await?;
        Ok(CommandDefinition {
            name: body.name,
            description: body.description,
            id: Some(body.id),
        })
    }

    async fn delete_command(
        &self,
        application_id: &str,
        guild_id: &str,
        command_id: &str,
    ) -> Result<(), PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!(
            "/applications/{}/guilds/{}/commands/{}",
            application_id, guild_id, command_id
        ));
        self.send_empty(self.http.delete(url)).await
    }

    async fn create_role(&self, guild_id: &str) -> Result<Role, PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!("/guilds/{}/roles", guild_id));
        self.send_json(self.http.post(url).json(&serde_json::json!({})))
            .await
    }

    async fn edit_role(
        &self,
        guild_id: &str,
        role_id: &str,
        params: &RoleParams,
    ) -> Result<Role, PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!("/guilds/{}/roles/{}", guild_id, role_id));
        self.send_json(self.http.patch(url).json(params)).await
    }

    async fn delete_role(&self, guild_id: &str, role_id: &str) -> Result<(), PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!("/guilds/{}/roles/{}", guild_id, role_id));
        self.send_empty(self.http.delete(url)).await
    }

    async fn add_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!(
            "/guilds/{}/members/{}/roles/{}",
            guild_id, member_id, role_id
        ));
        self.send_empty(self.http.put(url)).await
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.ensure_open()?;
        let url = self.url(&format!(
            "/guilds/{}/members/{}/roles/{}",
            guild_id, member_id, role_id
        ));
        self.send_empty(self.http.delete(url)).await
    }

    fn name(&self) -> &str {
        "discord"
    }
}
