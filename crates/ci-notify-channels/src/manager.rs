//! Dispatcher: runs every destination once, in a fixed order, and feeds
//! each outcome to the result reporter.
//!
//! Order is Twilio, then Slack, then Discord; a destination starts only after
//! the previous one (including every Twilio recipient) has finished.
//!
//! Failure policy:
//! - absent setup: skipped silently
//! - partial setup: a warning naming the missing inputs, then skipped
//! - delivery error: always logged; with `fail_on_error` the run stops and
//!   the error is returned, otherwise the next destination runs

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use ci_notify_core::config::{ApiEndpoints, Settings, Setup};
use ci_notify_core::context::InvocationContext;
use ci_notify_core::report::{incomplete_message, OutputSink, Reporter};
use ci_notify_core::types::{DispatchResult, NotificationContent};

use crate::base::Destination;
use crate::error::DispatchError;

// ─────────────────────────────────────────────
// Slots
// ─────────────────────────────────────────────

/// One destination position in the run.
struct Slot {
    name: &'static str,
    /// Name used in user-facing warnings ("Twilio argument ... missing.").
    display_name: &'static str,
    setup: Setup<Arc<dyn Destination>>,
}

/// Turn a configuration setup into a destination setup. `build` returns
/// `None` when the destination was compiled out.
fn bind<T>(
    name: &'static str,
    setup: &Setup<T>,
    build: impl FnOnce(&T) -> Option<Arc<dyn Destination>>,
) -> Setup<Arc<dyn Destination>> {
    match setup {
        Setup::Configured(config) => match build(config) {
            Some(destination) => Setup::Configured(destination),
            None => {
                warn!(destination = %name, "configured but not compiled in, skipping");
                Setup::Absent
            }
        },
        Setup::Partial { missing } => Setup::Partial {
            missing: missing.clone(),
        },
        Setup::Absent => Setup::Absent,
    }
}

#[cfg(feature = "twilio")]
fn twilio_destination(
    config: &ci_notify_core::config::TwilioConfig,
    endpoints: &ApiEndpoints,
    http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    Some(Arc::new(crate::twilio::TwilioDestination::new(
        config.clone(),
        &endpoints.twilio,
        http.clone(),
    )))
}

#[cfg(not(feature = "twilio"))]
fn twilio_destination(
    _config: &ci_notify_core::config::TwilioConfig,
    _endpoints: &ApiEndpoints,
    _http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    None
}

#[cfg(feature = "slack")]
fn slack_destination(
    config: &ci_notify_core::config::SlackConfig,
    endpoints: &ApiEndpoints,
    http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    Some(Arc::new(crate::slack::SlackDestination::new(
        config.clone(),
        &endpoints.slack,
        http.clone(),
    )))
}

#[cfg(not(feature = "slack"))]
fn slack_destination(
    _config: &ci_notify_core::config::SlackConfig,
    _endpoints: &ApiEndpoints,
    _http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    None
}

#[cfg(feature = "discord")]
fn discord_destination(
    config: &ci_notify_core::config::DiscordConfig,
    http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    Some(Arc::new(crate::discord::DiscordDestination::new(
        config.clone(),
        http.clone(),
    )))
}

#[cfg(not(feature = "discord"))]
fn discord_destination(
    _config: &ci_notify_core::config::DiscordConfig,
    _http: &reqwest::Client,
) -> Option<Arc<dyn Destination>> {
    None
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Sequential, fixed-order dispatch over the registered destinations.
pub struct Dispatcher {
    slots: Vec<Slot>,
    fail_on_error: bool,
}

impl Dispatcher {
    /// An empty dispatcher. Destinations run in registration order.
    pub fn new(fail_on_error: bool) -> Self {
        Self {
            slots: Vec::new(),
            fail_on_error,
        }
    }

    /// Build the standard Twilio → Slack → Discord line-up from settings,
    /// sharing one HTTP client.
    pub fn from_settings(settings: &Settings, http: reqwest::Client) -> Self {
        let endpoints = &settings.endpoints;
        let mut dispatcher = Self::new(settings.fail_on_error);

        dispatcher.register(
            "twilio",
            "Twilio",
            bind("twilio", &settings.twilio, |c| {
                twilio_destination(c, endpoints, &http)
            }),
        );
        dispatcher.register(
            "slack",
            "Slack",
            bind("slack", &settings.slack, |c| {
                slack_destination(c, endpoints, &http)
            }),
        );
        dispatcher.register(
            "discord",
            "Discord",
            bind("discord", &settings.discord, |c| discord_destination(c, &http)),
        );

        dispatcher
    }

    /// Append a destination slot.
    pub fn register(
        &mut self,
        name: &'static str,
        display_name: &'static str,
        setup: Setup<Arc<dyn Destination>>,
    ) {
        debug!(destination = %name, configured = setup.is_configured(), "registered destination");
        self.slots.push(Slot {
            name,
            display_name,
            setup,
        });
    }

    /// Names of destinations that will actually be sent to.
    pub fn configured_names(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|slot| slot.setup.is_configured())
            .map(|slot| slot.name)
            .collect()
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// Run every destination in order, publishing results as they complete.
    ///
    /// Returns `Err` only when `fail_on_error` is set and a delivery or a
    /// step output write failed. Outputs of destinations that completed
    /// before the failure have already been published.
    pub async fn run(
        &self,
        ctx: &InvocationContext,
        content: &NotificationContent,
        sink: &dyn OutputSink,
    ) -> Result<RunReport, DispatchError> {
        let reporter = Reporter::new(sink);
        let mut results = Vec::with_capacity(self.slots.len());

        info!(
            destinations = ?self.configured_names(),
            fail_on_error = self.fail_on_error,
            "dispatching notification"
        );

        for slot in &self.slots {
            let result = match &slot.setup {
                Setup::Absent => {
                    debug!(destination = %slot.name, "not configured, skipping");
                    DispatchResult::Skipped("not configured".into())
                }
                Setup::Partial { missing } => {
                    reporter.warn_incomplete(slot.display_name, missing);
                    DispatchResult::Skipped(incomplete_message(slot.display_name, missing))
                }
                Setup::Configured(destination) => match destination.send(ctx, content).await {
                    Ok(delivery) => delivery.into(),
                    Err(e) => {
                        error!(destination = %slot.name, error = %e, "notification failed");
                        if self.fail_on_error {
                            return Err(e);
                        }
                        DispatchResult::Failed(e.to_string())
                    }
                },
            };

            let result = match reporter.publish(slot.name, &result) {
                Ok(()) => result,
                Err(source) => {
                    let e = DispatchError::Output {
                        destination: slot.name,
                        source,
                    };
                    error!(destination = %slot.name, error = %e, "failed to publish result");
                    if self.fail_on_error {
                        return Err(e);
                    }
                    DispatchResult::Failed(e.to_string())
                }
            };
            results.push((slot.name, result));
        }

        Ok(RunReport { results })
    }
}

// ─────────────────────────────────────────────
// RunReport
// ─────────────────────────────────────────────

/// Per-destination outcomes of a completed run, in dispatch order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<(&'static str, DispatchResult)>,
}

impl RunReport {
    pub fn get(&self, name: &str) -> Option<&DispatchResult> {
        self.results
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, result)| result)
    }

    pub fn sent_count(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_sent()).count()
    }

    /// Destinations that were attempted and failed.
    pub fn failed(&self) -> Vec<&'static str> {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, DispatchResult::Failed(_)))
            .map(|(name, _)| *name)
            .collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
