//! Config loader: reads an optional JSON inputs file, overlays the action
//! inputs from the environment, and groups the result per destination.
//!
//! # Loading precedence
//! 1. Defaults (every input empty)
//! 2. JSON file from `--config` or `CI_NOTIFY_CONFIG`
//! 3. Environment variables `INPUT_<NAME>` (override JSON when non-empty)

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::schema::{
    ApiEndpoints, DiscordConfig, Inputs, Secret, Settings, Setup, SlackBotConfig, SlackConfig,
    SlackWebhookConfig, TwilioConfig,
};
use crate::types::NotificationContent;

/// Environment variable naming a JSON inputs file.
pub const CONFIG_PATH_ENV: &str = "CI_NOTIFY_CONFIG";

/// Environment override for the Twilio API base.
pub const TWILIO_API_BASE_ENV: &str = "CI_NOTIFY_TWILIO_API_BASE";

/// Environment override for the Slack Web API base.
pub const SLACK_API_BASE_ENV: &str = "CI_NOTIFY_SLACK_API_BASE";

/// Load and group everything for one run, reading the process environment.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let inputs = load_inputs(path);
    let endpoints = load_endpoints(|key| std::env::var(key).ok());
    group_inputs(&inputs, endpoints)
}

/// Load raw inputs from the config file (if any) plus `INPUT_*` variables.
pub fn load_inputs(path: Option<&Path>) -> Inputs {
    let config_path = path
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    let inputs = match config_path {
        Some(p) => load_inputs_from_path(&p),
        None => Inputs::default(),
    };

    apply_env_overrides(inputs, |key| std::env::var(key).ok())
}

/// Load inputs from a specific JSON file.
///
/// Falls back to defaults if the file doesn't exist or can't be parsed.
fn load_inputs_from_path(path: &Path) -> Inputs {
    if !path.exists() {
        info!("No config file found at {}, using action inputs only", path.display());
        return Inputs::default();
    }

    debug!("Loading inputs from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Inputs::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(inputs) => inputs,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Inputs::default()
        }
    }
}

/// Environment variable the runner uses for an input: `INPUT_<NAME>`,
/// upper-cased with spaces replaced by underscores.
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Overlay `INPUT_*` values. Empty values are ignored, since runners export
/// every declared input whether or not the workflow set it.
fn apply_env_overrides<F>(mut inputs: Inputs, lookup: F) -> Inputs
where
    F: Fn(&str) -> Option<String>,
{
    for (name, slot) in inputs.fields_mut() {
        if let Some(val) = lookup(&input_env_name(name)) {
            let val = val.trim();
            if !val.is_empty() {
                *slot = val.to_string();
            }
        }
    }
    inputs
}

/// Resolve API bases, honouring the `CI_NOTIFY_*_API_BASE` overrides.
fn load_endpoints<F>(lookup: F) -> ApiEndpoints
where
    F: Fn(&str) -> Option<String>,
{
    let mut endpoints = ApiEndpoints::default();
    if let Some(val) = lookup(TWILIO_API_BASE_ENV).as_deref().and_then(non_empty) {
        endpoints.twilio = val;
    }
    if let Some(val) = lookup(SLACK_API_BASE_ENV).as_deref().and_then(non_empty) {
        endpoints.slack = val;
    }
    endpoints
}

// ─────────────────────────────────────────────
// Grouping
// ─────────────────────────────────────────────

/// Group raw inputs into the shared content and one [`Setup`] per destination.
pub fn group_inputs(inputs: &Inputs, endpoints: ApiEndpoints) -> Settings {
    Settings {
        content: NotificationContent {
            message: inputs.message.trim().to_string(),
            color: non_empty(&inputs.color),
        },
        fail_on_error: parse_flag(&inputs.fail_on_error),
        endpoints,
        twilio: group_twilio(inputs),
        slack: group_slack(inputs),
        discord: group_discord(inputs),
    }
}

/// All five Twilio inputs or nothing: any one given means Twilio was
/// requested, and every missing one is reported.
fn group_twilio(inputs: &Inputs) -> Setup<TwilioConfig> {
    let account_sid = non_empty(&inputs.twilio_account_sid);
    let api_key_sid = non_empty(&inputs.twilio_api_key_sid);
    let api_key_secret = non_empty(&inputs.twilio_api_key_secret);
    let from_number = non_empty(&inputs.twilio_from_number);
    let to_numbers = parse_recipients(&inputs.twilio_to_numbers);

    let present = [
        ("twilio_account_sid", account_sid.is_some()),
        ("twilio_api_key_sid", api_key_sid.is_some()),
        ("twilio_api_key_secret", api_key_secret.is_some()),
        ("twilio_from_number", from_number.is_some()),
        ("twilio_to_numbers", to_numbers.is_some()),
    ];

    if !present.iter().any(|(_, set)| *set) {
        return Setup::Absent;
    }

    match (account_sid, api_key_sid, api_key_secret, from_number, to_numbers) {
        (
            Some(account_sid),
            Some(api_key_sid),
            Some(secret),
            Some(from_number),
            Some(to_numbers),
        ) => Setup::Configured(TwilioConfig {
            account_sid,
            api_key_sid,
            api_key_secret: Secret::new(secret),
            from_number,
            to_numbers,
        }),
        _ => Setup::Partial {
            missing: present
                .iter()
                .filter(|(_, set)| !set)
                .map(|(name, _)| *name)
                .collect(),
        },
    }
}

/// Bot token wins over webhook URL; bot mode also needs a channel name.
fn group_slack(inputs: &Inputs) -> Setup<SlackConfig> {
    let webhook_url = non_empty(&inputs.slack_webhook_url);
    let bot_token = non_empty(&inputs.slack_bot_token);
    let channel_name = non_empty(&inputs.slack_channel_name);
    let message_id = non_empty(&inputs.slack_message_id);
    let username = non_empty(&inputs.slack_username);
    let icon_url = non_empty(&inputs.slack_icon_url);

    if let Some(token) = bot_token {
        if webhook_url.is_some() {
            debug!("both slack_bot_token and slack_webhook_url set, using bot token");
        }
        return match channel_name {
            Some(channel_name) => Setup::Configured(SlackConfig::Bot(SlackBotConfig {
                token: Secret::new(token),
                channel_name,
                message_id,
                username,
                icon_url,
            })),
            None => Setup::Partial {
                missing: vec!["slack_channel_name"],
            },
        };
    }

    if let Some(url) = webhook_url {
        if channel_name.is_some() || message_id.is_some() {
            debug!("slack_channel_name/slack_message_id need slack_bot_token, ignoring");
        }
        return Setup::Configured(SlackConfig::Webhook(SlackWebhookConfig {
            url: Secret::new(url),
            username,
            icon_url,
        }));
    }

    if channel_name.is_some() || message_id.is_some() {
        Setup::Partial {
            missing: vec!["slack_bot_token"],
        }
    } else if username.is_some() || icon_url.is_some() {
        Setup::Partial {
            missing: vec!["slack_webhook_url"],
        }
    } else {
        Setup::Absent
    }
}

fn group_discord(inputs: &Inputs) -> Setup<DiscordConfig> {
    let username = non_empty(&inputs.discord_username);
    let avatar_url = non_empty(&inputs.discord_avatar);

    match non_empty(&inputs.discord_webhook_url) {
        Some(url) => Setup::Configured(DiscordConfig {
            webhook_url: Secret::new(url),
            username,
            avatar_url,
        }),
        None if username.is_some() || avatar_url.is_some() => Setup::Partial {
            missing: vec!["discord_webhook_url"],
        },
        None => Setup::Absent,
    }
}

// ─────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────

/// Split a comma-separated recipient list, trimming entries and dropping
/// empty ones. An empty result is `None`, not an empty list.
pub fn parse_recipients(raw: &str) -> Option<Vec<String>> {
    let numbers: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect();

    if numbers.is_empty() {
        None
    } else {
        Some(numbers)
    }
}

/// Boolean-like input: `true`, `1`, `yes`, `on` (any case) are on.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
