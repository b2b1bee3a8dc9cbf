//! Discord destination: one POST to an incoming webhook.
//!
//! The webhook answers `204 No Content` unless `?wait=true` is used, so the
//! published `discord_result` is usually empty.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use ci_notify_core::config::DiscordConfig;
use ci_notify_core::context::InvocationContext;
use ci_notify_core::types::NotificationContent;

use crate::base::{Delivery, Destination};
use crate::error::{body_to_value, read_body, DispatchError};
use crate::formatting::discord_message;

/// Output key for the webhook response body.
pub const DISCORD_OUTPUT: &str = "discord_result";

const NAME: &str = "discord";

pub struct DiscordDestination {
    config: DiscordConfig,
    http: reqwest::Client,
}

impl DiscordDestination {
    pub fn new(config: DiscordConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl Destination for DiscordDestination {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(
        &self,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError> {
        let mut payload = discord_message(content, &ctx.reference_link);
        if let Some(username) = &self.config.username {
            payload["username"] = json!(username);
        }
        if let Some(avatar_url) = &self.config.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        let response = self
            .http
            .post(self.config.webhook_url.expose())
            .json(&payload)
            .send()
            .await
            .map_err(DispatchError::transport(NAME))?;

        let body = read_body(NAME, response).await?;
        info!(embed = payload.get("embeds").is_some(), "discord message sent");
        Ok(Delivery::new(DISCORD_OUTPUT, body_to_value(body)))
    }
}
