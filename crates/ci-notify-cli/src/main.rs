//! ci-notify CLI: entry point.
//!
//! # Commands
//!
//! - `ci-notify [send]`: resolve the event, notify every configured
//!   destination, publish step outputs
//! - `ci-notify check`: show which destinations are configured

mod check;
mod helpers;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use ci_notify_channels::{build_http_client, Dispatcher};
use ci_notify_core::config::{load_settings, Settings};
use ci_notify_core::context::{InvocationContext, RawEvent};
use ci_notify_core::report::{ActionsOutput, OutputSink, Reporter};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Send CI build notifications to Twilio SMS, Slack and Discord
#[derive(Parser)]
#[command(name = "ci-notify", version, about, long_about = None)]
struct Cli {
    /// JSON file with input values (INPUT_* variables take precedence)
    #[arg(short, long, global = true, env = "CI_NOTIFY_CONFIG")]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Notify every configured destination (default)
    Send,

    /// Show destination configuration without sending anything
    Check,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command.unwrap_or(Commands::Send) {
        Commands::Send => run_send(config_path).await,
        Commands::Check => check::run(config_path.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Send command
// ─────────────────────────────────────────────

async fn run_send(config_path: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(config_path.as_deref());
    let ctx = InvocationContext::resolve(&RawEvent::from_env());

    if settings.content.message.is_empty() {
        warn!("message input is empty");
    }
    info!(
        event = ?ctx.event_kind,
        branch = %ctx.branch,
        reference = %ctx.reference_link,
        "resolved invocation context"
    );

    let http = build_http_client().context("failed to build HTTP client")?;
    dispatch(&settings, &ctx, http, &ActionsOutput::from_env()).await
}

/// Dispatch to every destination. A fail-fast failure is annotated as a
/// workflow error and returned, which makes the process exit 1.
async fn dispatch(
    settings: &Settings,
    ctx: &InvocationContext,
    http: reqwest::Client,
    sink: &dyn OutputSink,
) -> Result<()> {
    let dispatcher = Dispatcher::from_settings(settings, http);

    match dispatcher.run(ctx, &settings.content, sink).await {
        Ok(report) => {
            info!(
                sent = report.sent_count(),
                failed = ?report.failed(),
                "dispatch finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "dispatch aborted");
            Reporter::new(sink).fail(&e.to_string());
            Err(e.into())
        }
    }
}

/// Initialize tracing/logging on stderr; stdout carries workflow commands.
///
/// `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "ci_notify=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
