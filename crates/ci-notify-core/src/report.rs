//! Result Reporter: publishes each destination's outcome as a named step
//! output and surfaces diagnostics to the workflow log.
//!
//! Sinks:
//! - [`ActionsOutput`]: the runner's `GITHUB_OUTPUT` file plus workflow
//!   commands (`::warning::`, `::error::`) on stdout
//! - [`MemoryOutput`]: records everything, for tests

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::types::DispatchResult;

/// Severity of a workflow annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotation {
    Warning,
    Error,
}

impl Annotation {
    fn command(self) -> &'static str {
        match self {
            Annotation::Warning => "warning",
            Annotation::Error => "error",
        }
    }
}

/// Where step outputs and annotations go.
pub trait OutputSink: Send + Sync {
    /// Publish a named output value.
    fn set_output(&self, name: &str, value: &str) -> io::Result<()>;

    /// Surface a diagnostic in the workflow log.
    fn annotate(&self, level: Annotation, message: &str);
}

// ─────────────────────────────────────────────
// ActionsOutput
// ─────────────────────────────────────────────

/// Sink for a real workflow run.
pub struct ActionsOutput {
    /// `GITHUB_OUTPUT` file, if the runner provides one.
    output_file: Option<PathBuf>,
    delimiter_seq: AtomicU64,
}

impl ActionsOutput {
    /// Use the file named by `GITHUB_OUTPUT`, or stdout commands without it.
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::new(output_file)
    }

    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            delimiter_seq: AtomicU64::new(0),
        }
    }

    /// A heredoc delimiter that does not occur in `value`.
    fn delimiter_for(&self, value: &str) -> String {
        loop {
            let seq = self.delimiter_seq.fetch_add(1, Ordering::Relaxed);
            let delimiter = format!("ci_notify_eof_{}_{}", std::process::id(), seq);
            if !value.contains(&delimiter) {
                return delimiter;
            }
        }
    }
}

impl OutputSink for ActionsOutput {
    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        match &self.output_file {
            Some(path) => {
                let delimiter = self.delimiter_for(value);
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")?;
                debug!(output = %name, file = %path.display(), "wrote step output");
            }
            None => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "::set-output name={}::{}", name, escape_data(value))?;
            }
        }
        Ok(())
    }

    fn annotate(&self, level: Annotation, message: &str) {
        println!("::{}::{}", level.command(), escape_data(message));
    }
}

/// Escape a workflow command payload (`%`, CR, LF).
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

// ─────────────────────────────────────────────
// MemoryOutput
// ─────────────────────────────────────────────

/// Records outputs and annotations in memory.
#[derive(Default)]
pub struct MemoryOutput {
    outputs: Mutex<Vec<(String, String)>>,
    annotations: Mutex<Vec<(Annotation, String)>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// All published outputs, in publication order.
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Latest value published under `name`.
    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs()
            .into_iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn annotations(&self) -> Vec<(Annotation, String)> {
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl OutputSink for MemoryOutput {
    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn annotate(&self, level: Annotation, message: &str) {
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, message.to_string()));
    }
}

// ─────────────────────────────────────────────
// Reporter
// ─────────────────────────────────────────────

/// Turns dispatch outcomes and diagnostics into sink calls.
pub struct Reporter<'a> {
    sink: &'a dyn OutputSink,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn OutputSink) -> Self {
        Self { sink }
    }

    /// Publish a destination's result. Skipped and failed destinations
    /// publish nothing.
    pub fn publish(&self, destination: &str, result: &DispatchResult) -> io::Result<()> {
        match result.output_value() {
            Some((key, value)) => {
                debug!(destination = %destination, output = %key, "publishing result");
                self.sink.set_output(key, &value)
            }
            None => {
                debug!(destination = %destination, "no output to publish");
                Ok(())
            }
        }
    }

    /// Warn that a destination was requested but is missing inputs.
    pub fn warn_incomplete(&self, display_name: &str, missing: &[&str]) {
        let message = incomplete_message(display_name, missing);
        warn!("{}", message);
        self.sink.annotate(Annotation::Warning, &message);
    }

    /// Report the error that fails the run.
    pub fn fail(&self, message: &str) {
        self.sink.annotate(Annotation::Error, message);
    }
}

/// `"Twilio argument twilio_from_number missing."` /
/// `"Twilio arguments a, b missing."`
pub fn incomplete_message(display_name: &str, missing: &[&str]) -> String {
    format!(
        "{} argument{} {} missing.",
        display_name,
        if missing.len() == 1 { "" } else { "s" },
        missing.join(", ")
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
