//! Twilio SMS destination: one form-encoded `Messages` call per recipient.
//!
//! Recipients are sent to strictly one at a time, in the order configured:
//! recipient N's request is only issued once recipient N-1's has completed,
//! keeping a single request in flight against the Twilio API. The first
//! failure stops the remaining recipients.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use ci_notify_core::config::TwilioConfig;
use ci_notify_core::context::InvocationContext;
use ci_notify_core::types::NotificationContent;

use crate::base::{Delivery, Destination};
use crate::error::{body_to_value, read_body, DispatchError};

/// Output key for the ordered list of per-recipient responses.
pub const TWILIO_OUTPUT: &str = "twilio_result";

const NAME: &str = "twilio";

/// SMS via Twilio's REST API, authenticated with an API key pair.
pub struct TwilioDestination {
    config: TwilioConfig,
    /// API base, e.g. `https://api.twilio.com/2010-04-01`.
    api_base: String,
    http: reqwest::Client,
}

impl TwilioDestination {
    pub fn new(config: TwilioConfig, api_base: &str, http: reqwest::Client) -> Self {
        Self {
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// `{base}/Accounts/{sid}/Messages.json`
    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        )
    }

    /// Create one message for one recipient.
    async fn send_one(&self, body: &str, to: &str) -> Result<Value, DispatchError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(
                &self.config.api_key_sid,
                Some(self.config.api_key_secret.expose()),
            )
            .form(&[
                ("Body", body),
                ("From", self.config.from_number.as_str()),
                ("To", to),
            ])
            .send()
            .await
            .map_err(DispatchError::transport(NAME))?;

        let text = read_body(NAME, response).await?;
        Ok(body_to_value(text))
    }
}

#[async_trait]
impl Destination for TwilioDestination {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(
        &self,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError> {
        let body = content.with_link(&ctx.reference_link);
        let total = self.config.to_numbers.len();
        let mut responses = Vec::with_capacity(total);

        for (idx, to) in self.config.to_numbers.iter().enumerate() {
            debug!(recipient = idx + 1, total, "sending SMS");
            responses.push(self.send_one(&body, to).await?);
        }

        info!(recipients = total, "twilio messages sent");
        Ok(Delivery::new(TWILIO_OUTPUT, Value::Array(responses)))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ci_notify_core::config::Secret;
    use ci_notify_core::context::EventKind;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MESSAGES_PATH: &str = "/Accounts/AC123/Messages.json";

    fn make_config(to_numbers: &[&str]) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            api_key_sid: "SK456".into(),
            api_key_secret: Secret::new("key-secret"),
            from_number: "+15550000000".into(),
            to_numbers: to_numbers.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn make_ctx() -> InvocationContext {
        InvocationContext {
            event_kind: EventKind::Push,
            owner: "acme".into(),
            repo: "widgets".into(),
            branch: "main".into(),
            commit_sha: "0123456789abcdef".into(),
            reference_link: "https://github.com/acme/widgets/commit/0123456789abcdef".into(),
            reference_label: "\"Fix\" on main".into(),
            workflow: "CI".into(),
            server_url: "https://github.com".into(),
        }
    }

    fn destination(server: &MockServer, to_numbers: &[&str]) -> TwilioDestination {
        TwilioDestination::new(make_config(to_numbers), &server.uri(), reqwest::Client::new())
    }

    fn form_field(body: &[u8], key: &str) -> Option<String> {
        let text = String::from_utf8_lossy(body);
        text.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then(|| v.to_string())
        })
    }

    #[test]
    fn test_messages_url_trailing_slash() {
        let dest = TwilioDestination::new(
            make_config(&["+1"]),
            "https://api.twilio.com/2010-04-01/",
            reqwest::Client::new(),
        );
        assert_eq!(
            dest.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
        assert_eq!(dest.name(), "twilio");
    }

    #[tokio::test]
    async fn test_sends_each_recipient_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .and(basic_auth("SK456", "key-secret"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": "SM1",
                "status": "queued"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let dest = destination(&server, &["a", "b", "c"]);
        let delivery = dest
            .send(&make_ctx(), &NotificationContent::new("Build passed"))
            .await
            .unwrap();

        assert_eq!(delivery.output, TWILIO_OUTPUT);
        assert_eq!(delivery.response.as_array().unwrap().len(), 3);
        assert_eq!(delivery.response[0]["sid"], "SM1");

        let requests = server.received_requests().await.unwrap();
        let recipients: Vec<String> = requests
            .iter()
            .map(|r| form_field(&r.body, "To").unwrap())
            .collect();
        assert_eq!(recipients, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_body_is_message_blank_line_link() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .and(body_string_contains("From=%2B15550000000"))
            .and(body_string_contains("To=%2B15551111111"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM9" })))
            .expect(1)
            .mount(&server)
            .await;

        let dest = destination(&server, &["+15551111111"]);
        dest.send(&make_ctx(), &NotificationContent::new("Deployed"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = form_field(&requests[0].body, "Body").unwrap();
        assert!(body.starts_with("Deployed%0A%0Ahttps"), "body was {body}");
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_recipients() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 21211,
                "message": "The 'To' number is not a valid phone number."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dest = destination(&server, &["bad", "never-sent"]);
        let err = dest
            .send(&make_ctx(), &NotificationContent::new("x"))
            .await
            .unwrap_err();

        match err {
            DispatchError::Remote { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("21211"));
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_error() {
        let dest = TwilioDestination::new(
            make_config(&["+1"]),
            "http://127.0.0.1:1",
            reqwest::Client::new(),
        );
        let err = dest
            .send(&make_ctx(), &NotificationContent::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport { .. }));
    }
}
