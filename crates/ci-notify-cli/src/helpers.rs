//! Shared CLI helpers: path expansion and setup status rendering.

use std::path::PathBuf;

use colored::Colorize;

use ci_notify_core::config::Setup;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// One-line coloured status for a destination setup. `detail` describes a
/// configured setup (e.g. "3 recipients").
pub fn setup_status<T>(setup: &Setup<T>, detail: impl FnOnce(&T) -> String) -> String {
    match setup {
        Setup::Configured(config) => format!("{} {}", "✓".green(), detail(config)),
        Setup::Partial { missing } => format!(
            "{} missing {}",
            "⚠ partial,".yellow(),
            missing.join(", ").yellow()
        ),
        Setup::Absent => format!("{}", "· not configured".dimmed()),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/ci/inputs.json");
        assert!(result.ends_with("ci/inputs.json"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        let result = expand_tilde("/etc/ci-notify.json");
        assert_eq!(result, PathBuf::from("/etc/ci-notify.json"));
    }

    #[test]
    fn expand_tilde_bare() {
        let result = expand_tilde("~");
        assert!(!result.to_string_lossy().contains('~'));
    }

    #[test]
    fn setup_status_variants() {
        colored::control::set_override(false);

        let configured: Setup<u32> = Setup::Configured(3);
        assert_eq!(
            setup_status(&configured, |n| format!("{n} recipients")),
            "✓ 3 recipients"
        );

        let partial: Setup<u32> = Setup::Partial {
            missing: vec!["twilio_from_number", "twilio_to_numbers"],
        };
        assert_eq!(
            setup_status(&partial, |_| String::new()),
            "⚠ partial, missing twilio_from_number, twilio_to_numbers"
        );

        assert_eq!(setup_status(&Setup::<u32>::Absent, |_| String::new()), "· not configured");
    }
}
