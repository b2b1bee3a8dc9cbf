//! Dispatch errors and the shared response-reading helpers.

use serde_json::Value;
use thiserror::Error;
use tracing::error;

use ci_notify_core::utils::truncate_string;

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Everything that can go wrong while delivering to a destination.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request never got a response (DNS, TLS, connection reset, ...).
    #[error("{destination} request failed: {source}")]
    Transport {
        destination: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success HTTP status.
    #[error("{destination} returned HTTP {status}: {body}")]
    Remote {
        destination: &'static str,
        status: u16,
        body: String,
    },

    /// The remote answered 2xx but reported failure in the body
    /// (Slack's `"ok": false`).
    #[error("{destination} {method} failed: {code}")]
    Api {
        destination: &'static str,
        method: String,
        code: String,
    },

    /// A Slack channel name did not match any channel.
    #[error("Slack channel {0} not found")]
    ChannelNotFound(String),

    /// Publishing a destination's result as a step output failed.
    #[error("{destination} result could not be written to step outputs: {source}")]
    Output {
        destination: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Adapter for `map_err` on reqwest futures.
    pub fn transport(destination: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| DispatchError::Transport {
            destination,
            source,
        }
    }
}

/// Read a response body, turning non-success statuses into
/// [`DispatchError::Remote`].
pub(crate) async fn read_body(
    destination: &'static str,
    response: reqwest::Response,
) -> Result<String, DispatchError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(DispatchError::transport(destination))?;

    if !status.is_success() {
        error!(
            destination = %destination,
            status = %status,
            body = %truncate_string(&body, MAX_ERROR_BODY),
            "remote returned an error status"
        );
        return Err(DispatchError::Remote {
            destination,
            status: status.as_u16(),
            body: truncate_string(&body, MAX_ERROR_BODY),
        });
    }

    Ok(body)
}

/// JSON bodies become structured values; anything else (including an empty
/// body) is kept as a string.
pub(crate) fn body_to_value(body: String) -> Value {
    match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => Value::String(body),
    }
}
