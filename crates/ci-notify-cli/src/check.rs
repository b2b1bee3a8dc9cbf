//! `ci-notify check`: show what a `send` would do, without sending.
//!
//! - Config file in use, message and colour
//! - Per destination: configured (with mode), partial (with missing inputs)
//!   or absent

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use ci_notify_core::config::{load_settings, Settings, SlackConfig};
use ci_notify_core::utils::truncate_string;

use crate::helpers::setup_status;

/// Run the check command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let settings = load_settings(config_path);

    println!();
    println!("{}", "ci-notify configuration".cyan().bold());
    println!();

    let config_line = match config_path {
        Some(path) if path.exists() => format!("{} {}", path.display(), "✓".green()),
        Some(path) => format!("{} {}", path.display(), "(not found)".red()),
        None => format!("{}", "(action inputs only)".dimmed()),
    };
    println!("  {:<18} {}", "Config:".bold(), config_line);

    let message = if settings.content.message.is_empty() {
        "(empty)".red().to_string()
    } else {
        truncate_string(&settings.content.message, 60)
    };
    println!("  {:<18} {}", "Message:".bold(), message);
    println!(
        "  {:<18} {}",
        "Color:".bold(),
        settings.content.color.as_deref().unwrap_or("(none)").dimmed()
    );
    println!("  {:<18} {}", "Fail on error:".bold(), settings.fail_on_error);

    println!();
    println!("  {}", "Destinations:".bold());
    for (name, status) in destination_rows(&settings) {
        println!("    {:<20} {}", name, status);
    }
    println!();

    Ok(())
}

/// `(display name, status)` per destination, in dispatch order.
fn destination_rows(settings: &Settings) -> Vec<(&'static str, String)> {
    let twilio = setup_status(&settings.twilio, |c| {
        let noun = if c.to_numbers.len() == 1 { "recipient" } else { "recipients" };
        format!("{} {} from {}", c.to_numbers.len(), noun, c.from_number)
    });

    let slack = setup_status(&settings.slack, |c| match c {
        SlackConfig::Webhook(_) => "webhook".to_string(),
        SlackConfig::Bot(bot) => match &bot.message_id {
            Some(ts) => format!("bot token, update {} in {}", ts, bot.channel_name),
            None => format!("bot token, post to {}", bot.channel_name),
        },
    });

    let discord = setup_status(&settings.discord, |_| "webhook".to_string());

    vec![
        ("Twilio SMS", with_feature(cfg!(feature = "twilio"), twilio)),
        ("Slack", with_feature(cfg!(feature = "slack"), slack)),
        ("Discord", with_feature(cfg!(feature = "discord"), discord)),
    ]
}

fn with_feature(enabled: bool, status: String) -> String {
    if enabled {
        status
    } else {
        format!("{} {}", status, "(not compiled in)".red())
    }
}
