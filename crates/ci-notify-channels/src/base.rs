//! Destination trait: the interface every notification target implements.
//!
//! A destination is built only from a fully configured setup, so `send()`
//! never has to check for missing inputs. It formats its own payload from the
//! shared context and content, performs the delivery, and returns the remote
//! response to publish.

use async_trait::async_trait;
use serde_json::Value;

use ci_notify_core::context::InvocationContext;
use ci_notify_core::types::{DispatchResult, NotificationContent};

use crate::error::DispatchError;

/// A successful delivery: the remote response and the output key it is
/// published under.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub output: &'static str,
    pub response: Value,
}

impl Delivery {
    pub fn new(output: &'static str, response: Value) -> Self {
        Self { output, response }
    }
}

impl From<Delivery> for DispatchResult {
    fn from(delivery: Delivery) -> Self {
        DispatchResult::Sent {
            output: delivery.output,
            response: delivery.response,
        }
    }
}

/// Every notification destination implements this trait.
///
/// The `Dispatcher` holds `Arc<dyn Destination>` and calls `send()` once per
/// run, in a fixed order.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Unique lowercase name (e.g. "twilio", "slack", "discord").
    fn name(&self) -> &str;

    /// Deliver the notification.
    async fn send(
        &self,
        ctx: &InvocationContext,
        content: &NotificationContent,
    ) -> Result<Delivery, DispatchError>;
}
