//! Configuration schema: the flat action inputs and the typed,
//! per-destination settings they are grouped into.
//!
//! Inputs use the same snake_case keys on disk (JSON config file) and in the
//! workflow definition, so serde's default field naming is kept as-is.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::NotificationContent;

/// Default Twilio REST API base (2010-04-01 API version).
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Inputs whose values must never show up in logs.
const SECRET_INPUTS: &[&str] = &[
    "twilio_api_key_secret",
    "slack_webhook_url",
    "slack_bot_token",
    "discord_webhook_url",
];

// ─────────────────────────────────────────────
// Raw inputs
// ─────────────────────────────────────────────

/// Every named input the dispatcher recognises, as plain strings.
///
/// Values are stored as read; trimming and parsing happen when the inputs
/// are grouped into [`Settings`].
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inputs {
    pub message: String,
    pub color: String,
    pub fail_on_error: String,

    pub twilio_account_sid: String,
    pub twilio_api_key_sid: String,
    pub twilio_api_key_secret: String,
    pub twilio_from_number: String,
    /// Comma-separated recipient numbers.
    pub twilio_to_numbers: String,

    pub slack_webhook_url: String,
    pub slack_bot_token: String,
    pub slack_channel_name: String,
    pub slack_message_id: String,
    pub slack_icon_url: String,
    pub slack_username: String,

    pub discord_webhook_url: String,
    pub discord_username: String,
    pub discord_avatar: String,
}

impl Inputs {
    /// Every input as `(name, value)`, in declaration order.
    pub fn fields(&self) -> [(&'static str, &str); 17] {
        [
            ("message", &self.message),
            ("color", &self.color),
            ("fail_on_error", &self.fail_on_error),
            ("twilio_account_sid", &self.twilio_account_sid),
            ("twilio_api_key_sid", &self.twilio_api_key_sid),
            ("twilio_api_key_secret", &self.twilio_api_key_secret),
            ("twilio_from_number", &self.twilio_from_number),
            ("twilio_to_numbers", &self.twilio_to_numbers),
            ("slack_webhook_url", &self.slack_webhook_url),
            ("slack_bot_token", &self.slack_bot_token),
            ("slack_channel_name", &self.slack_channel_name),
            ("slack_message_id", &self.slack_message_id),
            ("slack_icon_url", &self.slack_icon_url),
            ("slack_username", &self.slack_username),
            ("discord_webhook_url", &self.discord_webhook_url),
            ("discord_username", &self.discord_username),
            ("discord_avatar", &self.discord_avatar),
        ]
    }

    /// Mutable access to every input, keyed like [`Inputs::fields`].
    pub fn fields_mut(&mut self) -> [(&'static str, &mut String); 17] {
        [
            ("message", &mut self.message),
            ("color", &mut self.color),
            ("fail_on_error", &mut self.fail_on_error),
            ("twilio_account_sid", &mut self.twilio_account_sid),
            ("twilio_api_key_sid", &mut self.twilio_api_key_sid),
            ("twilio_api_key_secret", &mut self.twilio_api_key_secret),
            ("twilio_from_number", &mut self.twilio_from_number),
            ("twilio_to_numbers", &mut self.twilio_to_numbers),
            ("slack_webhook_url", &mut self.slack_webhook_url),
            ("slack_bot_token", &mut self.slack_bot_token),
            ("slack_channel_name", &mut self.slack_channel_name),
            ("slack_message_id", &mut self.slack_message_id),
            ("slack_icon_url", &mut self.slack_icon_url),
            ("slack_username", &mut self.slack_username),
            ("discord_webhook_url", &mut self.discord_webhook_url),
            ("discord_username", &mut self.discord_username),
            ("discord_avatar", &mut self.discord_avatar),
        ]
    }
}

impl fmt::Debug for Inputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Inputs");
        for (name, value) in self.fields() {
            if SECRET_INPUTS.contains(&name) && !value.is_empty() {
                s.field(name, &"<redacted>");
            } else {
                s.field(name, &value);
            }
        }
        s.finish()
    }
}

// ─────────────────────────────────────────────
// Secrets
// ─────────────────────────────────────────────

/// A credential or secret URL. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value, for building requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ─────────────────────────────────────────────
// Destination configs
// ─────────────────────────────────────────────

/// How far a destination is configured.
///
/// Computed once by the loader; dispatch only ever sees `Configured` values.
#[derive(Clone, Debug, PartialEq)]
pub enum Setup<T> {
    /// Every required input is present.
    Configured(T),
    /// Some inputs were given, but these required ones are missing.
    Partial { missing: Vec<&'static str> },
    /// Nothing was given for this destination.
    Absent,
}

impl<T> Setup<T> {
    pub fn is_configured(&self) -> bool {
        matches!(self, Setup::Configured(_))
    }

    pub fn as_configured(&self) -> Option<&T> {
        match self {
            Setup::Configured(config) => Some(config),
            _ => None,
        }
    }

    /// Missing input names (empty unless `Partial`).
    pub fn missing(&self) -> &[&'static str] {
        match self {
            Setup::Partial { missing } => missing,
            _ => &[],
        }
    }
}

/// Twilio SMS settings. Only built when all five inputs are present.
#[derive(Clone, Debug, PartialEq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub api_key_sid: String,
    pub api_key_secret: Secret,
    pub from_number: String,
    /// Non-empty, in the order given.
    pub to_numbers: Vec<String>,
}

/// Slack settings: either a plain incoming webhook or a bot token.
#[derive(Clone, Debug, PartialEq)]
pub enum SlackConfig {
    Webhook(SlackWebhookConfig),
    Bot(SlackBotConfig),
}

/// Incoming-webhook mode: one POST, no channel lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct SlackWebhookConfig {
    pub url: Secret,
    pub username: Option<String>,
    pub icon_url: Option<String>,
}

/// Bot-token mode: channel lookup, create or update.
#[derive(Clone, Debug, PartialEq)]
pub struct SlackBotConfig {
    pub token: Secret,
    /// Human channel name, possibly decorated with `#` or `@`.
    pub channel_name: String,
    /// `ts` of a message to update instead of posting a new one.
    pub message_id: Option<String>,
    pub username: Option<String>,
    pub icon_url: Option<String>,
}

/// Discord incoming webhook settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscordConfig {
    pub webhook_url: Secret,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Remote API bases, overridable for proxies and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiEndpoints {
    pub twilio: String,
    pub slack: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            twilio: DEFAULT_TWILIO_API_BASE.to_string(),
            slack: DEFAULT_SLACK_API_BASE.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Grouped configuration for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub content: NotificationContent,
    /// Promote logged-only failures to a failed run.
    pub fail_on_error: bool,
    pub endpoints: ApiEndpoints,
    pub twilio: Setup<TwilioConfig>,
    pub slack: Setup<SlackConfig>,
    pub discord: Setup<DiscordConfig>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
