//! ci-notify channels: the notification destinations and the dispatcher
//! that runs them.
//!
//! This crate provides:
//! - **base**: the `Destination` trait every destination implements
//! - **manager**: `Dispatcher`: fixed-order, sequential dispatch with the
//!   fail-fast policy, feeding the result reporter
//! - **formatting**: Slack block/attachment and Discord content/embed payloads
//!
//! Destination implementations are feature-gated modules (all on by default).

pub mod base;
pub mod error;
pub mod formatting;
pub mod manager;

#[cfg(feature = "twilio")]
pub mod twilio;

#[cfg(feature = "slack")]
pub mod slack;

#[cfg(feature = "discord")]
pub mod discord;

pub use base::{Delivery, Destination};
pub use error::DispatchError;
pub use manager::{Dispatcher, RunReport};

/// Build the HTTP client shared by every destination.
///
/// No explicit timeout: requests use the client defaults.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ci-notify/", env!("CARGO_PKG_VERSION")))
        .build()
}
