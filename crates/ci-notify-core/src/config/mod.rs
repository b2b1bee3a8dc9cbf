//! Configuration system: raw inputs, loading, and destination grouping.
//!
//! # Usage
//! ```no_run
//! use ci_notify_core::config;
//!
//! let settings = config::load_settings(None);
//! println!("Twilio configured: {}", settings.twilio.is_configured());
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{group_inputs, load_inputs, load_settings};
pub use schema::{
    ApiEndpoints, DiscordConfig, Inputs, Secret, Settings, Setup, SlackBotConfig, SlackConfig,
    SlackWebhookConfig, TwilioConfig,
};
