//! Shared run types: the notification content every destination formats,
//! and the per-destination outcome handed to the reporter.

use serde_json::Value;

/// What to say, shared read-only by all destinations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NotificationContent {
    /// Message text (already trimmed).
    pub message: String,
    /// Hex (`#36a64f`) or platform-named (`good`) colour.
    pub color: Option<String>,
}

impl NotificationContent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The message followed by a blank line and the reference link.
    pub fn with_link(&self, link: &str) -> String {
        format!("{}\n\n{}", self.message, link)
    }
}

/// Parse a hex colour (`#ff0000` or `ff0000`) into its integer value.
///
/// Returns `None` for named colours or anything that isn't 1–6 hex digits.
pub fn parse_hex_color(color: &str) -> Option<u32> {
    let digits = color.trim().trim_start_matches('#');
    if digits.is_empty() || digits.len() > 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Outcome of one destination for this run. Consumed once by the reporter.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchResult {
    /// Delivered; `response` is published under the `output` key.
    Sent {
        output: &'static str,
        response: Value,
    },
    /// Not attempted (absent or partial configuration).
    Skipped(String),
    /// Attempted and failed; the error was logged.
    Failed(String),
}

impl DispatchResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchResult::Sent { .. })
    }

    /// `(key, value)` to publish, if any. Strings are written raw, anything
    /// else as compact JSON.
    pub fn output_value(&self) -> Option<(&'static str, String)> {
        match self {
            DispatchResult::Sent { output, response } => {
                let value = match response {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                Some((*output, value))
            }
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
