//! ci-notify core: everything the dispatcher needs before and after the
//! network calls.
//!
//! - **config**: raw action inputs, the JSON/env loader, and the grouping of
//!   inputs into per-destination [`config::Setup`] values
//! - **context**: the Context Resolver (branch, commit, reference link/label)
//! - **types**: shared `NotificationContent` and `DispatchResult`
//! - **report**: the Result Reporter and its output sinks
//! - **utils**: small string helpers

pub mod config;
pub mod context;
pub mod report;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use context::{EventKind, InvocationContext, RawEvent};
pub use report::{ActionsOutput, Annotation, MemoryOutput, OutputSink, Reporter};
pub use types::{DispatchResult, NotificationContent};
