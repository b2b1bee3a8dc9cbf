//! Payload formatting for the chat destinations.
//!
//! Slack renders plain and coloured messages through different schemas:
//! - no colour → top-level `text` (notification preview) + `blocks`
//! - colour → one `attachments` entry carrying `color` and the same blocks,
//!   with no top-level `text`
//!
//! Discord likewise switches from plain `content` to an `embeds` entry when
//! a hex colour is set.

use serde_json::{json, Value};
use tracing::warn;

use ci_notify_core::types::{parse_hex_color, NotificationContent};

/// Escape the three characters Slack mrkdwn treats as control characters.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `<url|label>` with the label escaped.
pub fn mrkdwn_link(url: &str, label: &str) -> String {
    format!("<{}|{}>", url, escape_mrkdwn(label))
}

/// Section with the message, then a context footer with one mrkdwn element
/// per entry of `context`.
pub fn slack_blocks(message: &str, context: &[String]) -> Value {
    let elements: Vec<Value> = context
        .iter()
        .map(|text| json!({ "type": "mrkdwn", "text": text }))
        .collect();

    let mut blocks = vec![json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": message }
    })];
    if !elements.is_empty() {
        blocks.push(json!({ "type": "context", "elements": elements }));
    }

    Value::Array(blocks)
}

/// Full Slack message body (without channel or identity fields).
pub fn slack_message(content: &NotificationContent, context: &[String]) -> Value {
    let blocks = slack_blocks(&content.message, context);

    match &content.color {
        Some(color) => json!({
            "attachments": [{
                "color": color,
                "blocks": blocks
            }]
        }),
        None => json!({
            "text": content.message,
            "blocks": blocks
        }),
    }
}

/// Discord webhook body (without identity fields).
///
/// Named colours can't be expressed as an embed colour, so they fall back
/// to the plain layout.
pub fn discord_message(content: &NotificationContent, link: &str) -> Value {
    let text = content.with_link(link);

    match content.color.as_deref() {
        Some(color) => match parse_hex_color(color) {
            Some(value) => json!({
                "embeds": [{ "title": text, "color": value }]
            }),
            None => {
                warn!(color = %color, "color is not a hex value, sending plain Discord message");
                json!({ "content": text })
            }
        },
        None => json!({ "content": text }),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://github.com/acme/widgets/pull/42";

    #[test]
    fn test_escape_mrkdwn() {
        assert_eq!(escape_mrkdwn("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_mrkdwn("plain"), "plain");
    }

    #[test]
    fn test_mrkdwn_link() {
        assert_eq!(
            mrkdwn_link(LINK, "Fix <script>"),
            format!("<{LINK}|Fix &lt;script&gt;>")
        );
    }

    #[test]
    fn test_slack_blocks_layout() {
        let blocks = slack_blocks("Build passed", &["one".to_string(), "two".to_string()]);
        assert_eq!(blocks[0]["type"], "section");
        assert_eq!(blocks[0]["text"]["text"], "Build passed");
        assert_eq!(blocks[1]["type"], "context");
        assert_eq!(blocks[1]["elements"].as_array().unwrap().len(), 2);
        assert_eq!(blocks[1]["elements"][1]["text"], "two");
    }

    #[test]
    fn test_slack_blocks_without_context() {
        let blocks = slack_blocks("hi", &[]);
        assert_eq!(blocks.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_slack_message_plain() {
        let content = NotificationContent::new("Build passed");
        let payload = slack_message(&content, &[mrkdwn_link(LINK, "PR")]);
        assert_eq!(payload["text"], "Build passed");
        assert!(payload["blocks"].is_array());
        assert!(payload.get("attachments").is_none());
    }

    #[test]
    fn test_slack_message_colored() {
        let content = NotificationContent::new("Build failed").with_color("#ff0000");
        let payload = slack_message(&content, &[mrkdwn_link(LINK, "PR")]);
        assert!(payload.get("text").is_none());
        assert!(payload.get("blocks").is_none());
        assert_eq!(payload["attachments"][0]["color"], "#ff0000");
        assert_eq!(payload["attachments"][0]["blocks"][0]["type"], "section");
    }

    #[test]
    fn test_discord_message_plain() {
        let content = NotificationContent::new("Build passed");
        let payload = discord_message(&content, LINK);
        assert_eq!(payload["content"], format!("Build passed\n\n{LINK}"));
        assert!(payload.get("embeds").is_none());
    }

    #[test]
    fn test_discord_message_embed() {
        let content = NotificationContent::new("Build failed").with_color("#ff0000");
        let payload = discord_message(&content, LINK);
        assert!(payload.get("content").is_none());
        assert_eq!(payload["embeds"][0]["title"], format!("Build failed\n\n{LINK}"));
        assert_eq!(payload["embeds"][0]["color"], 0xff0000);
    }

    #[test]
    fn test_discord_message_named_color_falls_back() {
        let content = NotificationContent::new("Build passed").with_color("good");
        let payload = discord_message(&content, LINK);
        assert!(payload.get("embeds").is_none());
        assert!(payload["content"].is_string());
    }
}
