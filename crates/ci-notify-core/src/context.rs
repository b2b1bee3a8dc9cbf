//! Context Resolver: turns the triggering workflow event into the branch,
//! commit and human-facing reference every destination links back to.
//!
//! The raw event comes from the runner environment (`GITHUB_*` variables and
//! the JSON payload at `GITHUB_EVENT_PATH`). Resolution itself is pure.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::utils::short_sha;

/// Default web host for commit links.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Which kind of event triggered the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    PullRequest,
    /// Push and every other direct event.
    Push,
}

impl EventKind {
    /// Classify a runner event name.
    pub fn from_event_name(name: &str) -> Self {
        match name {
            "pull_request" | "pull_request_target" => EventKind::PullRequest,
            _ => EventKind::Push,
        }
    }
}

/// The triggering event as the runner exposes it.
#[derive(Clone, Debug, Default)]
pub struct RawEvent {
    /// `GITHUB_EVENT_NAME`
    pub event_name: String,
    /// `GITHUB_REF`, e.g. `refs/heads/main`
    pub git_ref: String,
    /// `GITHUB_SHA`
    pub sha: String,
    /// `GITHUB_REPOSITORY`, `owner/repo`
    pub repository: String,
    /// `GITHUB_WORKFLOW`
    pub workflow: String,
    /// `GITHUB_SERVER_URL`
    pub server_url: String,
    /// Parsed contents of `GITHUB_EVENT_PATH`.
    pub payload: Value,
}

impl RawEvent {
    /// Read the event from the process environment.
    ///
    /// A missing or unreadable payload file yields an empty payload.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();

        let payload = match std::env::var_os("GITHUB_EVENT_PATH") {
            Some(path) => read_payload(Path::new(&path)),
            None => {
                debug!("GITHUB_EVENT_PATH not set, using empty event payload");
                Value::Object(Default::default())
            }
        };

        Self {
            event_name: var("GITHUB_EVENT_NAME"),
            git_ref: var("GITHUB_REF"),
            sha: var("GITHUB_SHA"),
            repository: var("GITHUB_REPOSITORY"),
            workflow: var("GITHUB_WORKFLOW"),
            server_url: var("GITHUB_SERVER_URL"),
            payload,
        }
    }
}

fn read_payload(path: &Path) -> Value {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read event payload {}: {}", path.display(), e);
            return Value::Object(Default::default());
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Failed to parse event payload: {}", e);
        Value::Object(Default::default())
    })
}

/// Everything the destinations need to know about the triggering event.
///
/// Derived once per run and only ever read afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationContext {
    pub event_kind: EventKind,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub commit_sha: String,
    pub reference_link: String,
    pub reference_label: String,
    pub workflow: String,
    pub server_url: String,
}

impl InvocationContext {
    /// Resolve branch, commit and reference from a raw event.
    pub fn resolve(event: &RawEvent) -> Self {
        let event_kind = EventKind::from_event_name(&event.event_name);
        let (owner, repo) = split_repository(&event.repository);
        let server_url = if event.server_url.is_empty() {
            DEFAULT_SERVER_URL.to_string()
        } else {
            event.server_url.trim_end_matches('/').to_string()
        };

        let mut ctx = Self {
            event_kind,
            owner,
            repo,
            branch: String::new(),
            commit_sha: String::new(),
            reference_link: String::new(),
            reference_label: String::new(),
            workflow: event.workflow.clone(),
            server_url,
        };

        match event_kind {
            EventKind::PullRequest => {
                let pr = &event.payload["pull_request"];
                ctx.branch = str_field(&pr["head"]["ref"]);
                ctx.commit_sha = str_field(&pr["head"]["sha"]);
                ctx.reference_link = str_field(&pr["html_url"]);
                ctx.reference_label = str_field(&pr["title"]);
            }
            EventKind::Push => {
                ctx.branch = branch_from_ref(&event.git_ref).to_string();
                ctx.commit_sha = event.sha.clone();
                ctx.reference_link = ctx.commit_url();
                let headline = event.payload["head_commit"]["message"]
                    .as_str()
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| short_sha(&ctx.commit_sha).to_string());
                ctx.reference_label = format!("\"{}\" on {}", headline, ctx.branch);
            }
        }

        debug!(
            event = ?ctx.event_kind,
            branch = %ctx.branch,
            sha = %ctx.commit_sha,
            link = %ctx.reference_link,
            "resolved invocation context"
        );

        ctx
    }

    /// `<server>/<owner>/<repo>/commit/<sha>`
    pub fn commit_url(&self) -> String {
        format!(
            "{}/{}/{}/commit/{}",
            self.server_url, self.owner, self.repo, self.commit_sha
        )
    }
}

/// Strip a leading `refs/heads/` from a ref; other refs pass through.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

fn split_repository(repository: &str) -> (String, String) {
    match repository.split_once('/') {
        Some((owner, repo)) => (owner.to_string(), repo.to_string()),
        None => (String::new(), repository.to_string()),
    }
}

fn str_field(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn push_event(git_ref: &str) -> RawEvent {
        RawEvent {
            event_name: "push".into(),
            git_ref: git_ref.into(),
            sha: "0123456789abcdef0123456789abcdef01234567".into(),
            repository: "acme/widgets".into(),
            workflow: "CI".into(),
            server_url: String::new(),
            payload: json!({
                "head_commit": { "message": "Fix flaky test" }
            }),
        }
    }

    fn pr_event() -> RawEvent {
        RawEvent {
            event_name: "pull_request".into(),
            git_ref: "refs/pull/42/merge".into(),
            sha: "ffffffffffffffffffffffffffffffffffffffff".into(),
            repository: "acme/widgets".into(),
            workflow: "CI".into(),
            server_url: "https://github.com".into(),
            payload: json!({
                "pull_request": {
                    "html_url": "https://github.com/acme/widgets/pull/42",
                    "title": "Add sprockets",
                    "head": {
                        "ref": "feature/sprockets",
                        "sha": "abcdef0123456789abcdef0123456789abcdef01"
                    }
                }
            }),
        }
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(EventKind::from_event_name("pull_request"), EventKind::PullRequest);
        assert_eq!(
            EventKind::from_event_name("pull_request_target"),
            EventKind::PullRequest
        );
        assert_eq!(EventKind::from_event_name("push"), EventKind::Push);
        assert_eq!(EventKind::from_event_name("workflow_dispatch"), EventKind::Push);
    }

    #[test]
    fn test_branch_prefix_stripped() {
        let ctx = InvocationContext::resolve(&push_event("refs/heads/main"));
        assert_eq!(ctx.branch, "main");
    }

    #[test]
    fn test_branch_without_prefix_unchanged() {
        let ctx = InvocationContext::resolve(&push_event("main"));
        assert_eq!(ctx.branch, "main");
    }

    #[test]
    fn test_branch_nested_name_kept() {
        assert_eq!(branch_from_ref("refs/heads/release/1.2"), "release/1.2");
        assert_eq!(branch_from_ref("refs/tags/v1.0"), "refs/tags/v1.0");
    }

    #[test]
    fn test_push_reference() {
        let ctx = InvocationContext::resolve(&push_event("refs/heads/main"));
        assert_eq!(ctx.event_kind, EventKind::Push);
        assert_eq!(ctx.commit_sha, "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(
            ctx.reference_link,
            "https://github.com/acme/widgets/commit/0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(ctx.reference_label, "\"Fix flaky test\" on main");
        assert_eq!(ctx.owner, "acme");
        assert_eq!(ctx.repo, "widgets");
    }

    #[test]
    fn test_push_without_head_commit_uses_short_sha() {
        let mut event = push_event("refs/heads/main");
        event.payload = json!({});
        let ctx = InvocationContext::resolve(&event);
        assert_eq!(ctx.reference_label, "\"0123456\" on main");
    }

    #[test]
    fn test_pull_request_reference() {
        let ctx = InvocationContext::resolve(&pr_event());
        assert_eq!(ctx.event_kind, EventKind::PullRequest);
        assert_eq!(ctx.branch, "feature/sprockets");
        assert_eq!(ctx.commit_sha, "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(ctx.reference_link, "https://github.com/acme/widgets/pull/42");
        assert_eq!(ctx.reference_label, "Add sprockets");
    }

    #[test]
    fn test_commit_url_uses_server() {
        let mut event = push_event("refs/heads/main");
        event.server_url = "https://ghe.example.com/".into();
        let ctx = InvocationContext::resolve(&event);
        assert!(ctx
            .commit_url()
            .starts_with("https://ghe.example.com/acme/widgets/commit/"));
    }

    #[test]
    fn test_read_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"head_commit":{"message":"hi"}}"#).unwrap();
        let payload = read_payload(file.path());
        assert_eq!(payload["head_commit"]["message"], "hi");
    }

    #[test]
    fn test_read_payload_missing_file() {
        let payload = read_payload(Path::new("/nonexistent/event.json"));
        assert!(payload.as_object().unwrap().is_empty());
    }
}
