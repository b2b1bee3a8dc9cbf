//! Slack destination: incoming webhook or Web API bot token.
//!
//! Webhook mode posts one block message to the secret URL and publishes the
//! response body as `slack_result`.
//!
//! Bot-token mode:
//! - resolves the channel name to an id by paging through
//!   `conversations.list` (a lazy stream, consumed until a match)
//! - posts with `chat.postMessage`, or edits with `chat.update` when an
//!   existing message `ts` was given
//! - publishes the message `ts` as `slack_message_id`, so a later step can
//!   update the same message

use async_trait::async_trait;
use futures_util::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use ci_notify_core::config::{SlackBotConfig, SlackConfig, SlackWebhookConfig};
use ci_notify_core::context::InvocationContext;
use ci_notify_core::types::NotificationContent;
use ci_notify_core::utils::short_sha;

use crate::base::{Delivery, Destination};
use crate::error::{read_body, DispatchError};
use crate::formatting::{escape_mrkdwn, mrkdwn_link, slack_message};

// ─────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────

/// Output key for the webhook response body.
pub const SLACK_RESULT_OUTPUT: &str = "slack_result";

/// Output key for the posted/updated message `ts`.
pub const SLACK_MESSAGE_ID_OUTPUT: &str = "slack_message_id";

/// Channels requested per `conversations.list` page.
const CHANNELS_PAGE_LIMIT: &str = "200";

const NAME: &str = "slack";

// ─────────────────────────────────────────────
// Web API types
// ─────────────────────────────────────────────

/// One entry of `conversations.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<ChannelInfo>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

/// Position in the channel listing.
enum PageCursor {
    First,
    Next(String),
    Done,
}

/// Strip `#`/`@` decoration from a channel name given by a human.
pub fn normalize_channel_name(name: &str) -> &str {
    name.trim().trim_start_matches(|c| c == '#' || c == '@')
}

// ─────────────────────────────────────────────
// SlackDestination
// ─────────────────────────────────────────────

/// Slack destination in either webhook or bot-token mode.
pub struct SlackDestination {
    config: SlackConfig,
    /// Web API base, e.g. `https://slack.com/api`. Unused in webhook mode.
    api_base: String,
    http: reqwest::Client,
}

impl SlackDestination {
    pub fn new(config: SlackConfig, api_base: &str, http: reqwest::Client) -> Self {
        Self {
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
            http,
        }
    }

    // ─────────────────────────────────────────
    // Webhook mode
    // ─────────────────────────────────────────

    async fn send_webhook(
        &self,
        hook: &SlackWebhookConfig,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError> {
        let context = [mrkdwn_link(&ctx.reference_link, &ctx.reference_label)];
        let mut payload = slack_message(content, &context);
        if let Some(username) = &hook.username {
            payload["username"] = json!(username);
        }
        if let Some(icon_url) = &hook.icon_url {
            payload["icon_url"] = json!(icon_url);
        }

        let response = self
            .http
            .post(hook.url.expose())
            .json(&payload)
            .send()
            .await
            .map_err(DispatchError::transport(NAME))?;

        let body = read_body(NAME, response).await?;
        info!(colored = content.color.is_some(), "slack webhook message sent");
        Ok(Delivery::new(SLACK_RESULT_OUTPUT, Value::String(body)))
    }

    // ─────────────────────────────────────────
    // Bot-token mode
    // ─────────────────────────────────────────

    async fn send_bot(
        &self,
        bot: &SlackBotConfig,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError> {
        let token = bot.token.expose();

        let channel_id = self
            .resolve_channel_id(token, &bot.channel_name)
            .await?
            .ok_or_else(|| DispatchError::ChannelNotFound(bot.channel_name.clone()))?;

        let mut context = Vec::with_capacity(3);
        if !ctx.workflow.is_empty() {
            context.push(format!("*{}*", escape_mrkdwn(&ctx.workflow)));
        }
        context.push(mrkdwn_link(&ctx.commit_url(), short_sha(&ctx.commit_sha)));
        context.push(mrkdwn_link(&ctx.reference_link, &ctx.reference_label));

        let mut payload = slack_message(content, &context);
        payload["channel"] = json!(channel_id);

        let api_method = match &bot.message_id {
            Some(ts) => {
                payload["ts"] = json!(ts);
                "chat.update"
            }
            None => {
                if let Some(username) = &bot.username {
                    payload["username"] = json!(username);
                }
                if let Some(icon_url) = &bot.icon_url {
                    payload["icon_url"] = json!(icon_url);
                }
                "chat.postMessage"
            }
        };

        let body = self.api_post(token, api_method, &payload).await?;
        // An update may omit `ts`; the id being edited is still valid.
        let ts = match (body["ts"].as_str(), bot.message_id.as_deref()) {
            (Some(ts), _) | (None, Some(ts)) => ts.to_string(),
            (None, None) => {
                return Err(DispatchError::Api {
                    destination: NAME,
                    method: api_method.to_string(),
                    code: "missing ts".into(),
                })
            }
        };

        info!(
            method = %api_method,
            channel = %channel_id,
            ts = %ts,
            "slack message delivered"
        );
        Ok(Delivery::new(SLACK_MESSAGE_ID_OUTPUT, Value::String(ts)))
    }

    /// Lazily page through `conversations.list`. Each call starts a fresh
    /// listing; the stream ends when Slack stops returning a cursor.
    pub fn channel_pages<'a>(
        &'a self,
        token: &'a str,
    ) -> impl Stream<Item = Result<Vec<ChannelInfo>, DispatchError>> + 'a {
        stream::try_unfold(PageCursor::First, move |cursor| {
            self.next_channel_page(token, cursor)
        })
    }

    async fn next_channel_page(
        &self,
        token: &str,
        cursor: PageCursor,
    ) -> Result<Option<(Vec<ChannelInfo>, PageCursor)>, DispatchError> {
        let cursor = match cursor {
            PageCursor::Done => return Ok(None),
            PageCursor::First => None,
            PageCursor::Next(c) => Some(c),
        };

        let mut query = vec![
            ("limit", CHANNELS_PAGE_LIMIT),
            ("exclude_archived", "true"),
            ("types", "public_channel,private_channel"),
        ];
        if let Some(c) = cursor.as_deref() {
            query.push(("cursor", c));
        }

        let body = self.api_get(token, "conversations.list", &query).await?;
        let page: ConversationsPage =
            serde_json::from_value(body).map_err(|e| DispatchError::Api {
                destination: NAME,
                method: "conversations.list".into(),
                code: format!("unexpected response: {e}"),
            })?;

        let next = match page.response_metadata.map(|m| m.next_cursor) {
            Some(c) if !c.is_empty() => PageCursor::Next(c),
            _ => PageCursor::Done,
        };

        debug!(channels = page.channels.len(), "fetched channel page");
        Ok(Some((page.channels, next)))
    }

    /// Find the id of the channel called `channel_name`, ignoring leading
    /// `#`/`@`. `None` once every page has been checked without a match.
    pub async fn resolve_channel_id(
        &self,
        token: &str,
        channel_name: &str,
    ) -> Result<Option<String>, DispatchError> {
        let wanted = normalize_channel_name(channel_name);
        let pages = self.channel_pages(token);
        futures_util::pin_mut!(pages);

        let mut scanned = 0usize;
        while let Some(page) = pages.try_next().await? {
            scanned += page.len();
            if let Some(channel) = page.into_iter().find(|c| c.name == wanted) {
                debug!(channel = %wanted, id = %channel.id, "resolved slack channel");
                return Ok(Some(channel.id));
            }
        }

        debug!(channel = %wanted, scanned, "slack channel not found");
        Ok(None)
    }

    // ─────────────────────────────────────────
    // Web API helpers
    // ─────────────────────────────────────────

    async fn api_get(
        &self,
        token: &str,
        api_method: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, DispatchError> {
        let response = self
            .http
            .get(format!("{}/{}", self.api_base, api_method))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(DispatchError::transport(NAME))?;

        Self::check_ok(api_method, read_body(NAME, response).await?)
    }

    async fn api_post(
        &self,
        token: &str,
        api_method: &str,
        payload: &Value,
    ) -> Result<Value, DispatchError> {
        let response = self
            .http
            .post(format!("{}/{}", self.api_base, api_method))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(DispatchError::transport(NAME))?;

        Self::check_ok(api_method, read_body(NAME, response).await?)
    }

    /// Parse a Web API body and reject `"ok": false`.
    fn check_ok(api_method: &str, body: String) -> Result<Value, DispatchError> {
        let value: Value = serde_json::from_str(&body).map_err(|e| DispatchError::Api {
            destination: NAME,
            method: api_method.to_string(),
            code: format!("invalid JSON response: {e}"),
        })?;

        if value["ok"].as_bool() != Some(true) {
            let code = value["error"].as_str().unwrap_or("unknown").to_string();
            return Err(DispatchError::Api {
                destination: NAME,
                method: api_method.to_string(),
                code,
            });
        }

        Ok(value)
    }
}

// ─────────────────────────────────────────────
// Destination trait implementation
// ─────────────────────────────────────────────

#[async_trait]
impl Destination for SlackDestination {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(
        &self,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError> {
        match &self.config {
            SlackConfig::Webhook(hook) => self.send_webhook(hook, ctx, content).await,
            SlackConfig::Bot(bot) => self.send_bot(bot, ctx, content).await,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
