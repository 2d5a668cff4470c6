//! Choosing a capture mechanism for a target string.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::checklist::{TargetKind, TargetSpec};
use crate::error::{Error, Result};

use super::event::CaptureEvent;

const TERMINAL_FRAMEWORKS: [&str; 2] = ["ratatui", "crossterm"];

/// Ports common development servers listen on, in the order they are tried.
pub const DEV_SERVER_PORTS: [u16; 8] = [3000, 3001, 5173, 5174, 8080, 8000, 4200, 4000];

/// Concrete capture mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Automation driver session; supports every event.
    Browser,
    /// One-shot headless screenshot.
    Headless,
    /// Hosted terminal program.
    Tui,
    /// Desktop window grab.
    Gui,
    /// Command output.
    Cli,
}

impl AdapterKind {
    /// Lowercase adapter name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Headless => "headless",
            Self::Tui => "tui",
            Self::Gui => "gui",
            Self::Cli => "cli",
        }
    }

    /// Whether this adapter can perform `event`.
    #[must_use]
    pub fn supports(self, event: &CaptureEvent) -> bool {
        match self {
            Self::Browser => true,
            Self::Tui => {
                matches!(event, CaptureEvent::Screenshot | CaptureEvent::Wait(_) | CaptureEvent::Input(_))
            }
            Self::Headless | Self::Gui | Self::Cli => {
                matches!(event, CaptureEvent::Screenshot | CaptureEvent::Wait(_))
            }
        }
    }

    /// The adapter a target kind maps to before availability checks.
    #[must_use]
    pub fn for_target(kind: TargetKind) -> Option<Self> {
        match kind {
            TargetKind::Webapp => Some(Self::Browser),
            TargetKind::Gui => Some(Self::Gui),
            TargetKind::Tui => Some(Self::Tui),
            TargetKind::Cli => Some(Self::Cli),
            TargetKind::Unknown => None,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" | "webapp" => Ok(Self::Browser),
            "headless" => Ok(Self::Headless),
            "tui" => Ok(Self::Tui),
            "gui" | "window" => Ok(Self::Gui),
            "cli" => Ok(Self::Cli),
            other => Err(Error::Parse(format!(
                "unknown adapter {other:?} (expected browser, headless, tui, gui or cli)"
            ))),
        }
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| s[prefix.len()..].trim())
}

fn resolved(kind: TargetKind, locator: &str, original: &str) -> Result<TargetSpec> {
    if locator.is_empty() {
        return Err(Error::TargetUnresolved(original.to_string()));
    }
    Ok(TargetSpec::new(kind, locator))
}

/// Classify a free-form target string.
///
/// Rules, first match wins:
/// `http(s)://`, `localhost:` or `127.0.0.1:` prefix → webapp;
/// `window:` prefix or `.exe` suffix → gui;
/// `tui:` prefix or a terminal-framework token → tui;
/// `cli:` prefix or anything else → cli.
///
/// # Errors
///
/// Returns [`Error::TargetUnresolved`] for an empty target or a prefix with
/// nothing after it.
pub fn detect(target: &str) -> Result<TargetSpec> {
    let t = target.trim();
    if t.is_empty() {
        return Err(Error::TargetUnresolved(target.to_string()));
    }
    let lower = t.to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return resolved(TargetKind::Webapp, t, target);
    }
    if lower.starts_with("localhost:") || lower.starts_with("127.0.0.1:") {
        return resolved(TargetKind::Webapp, &format!("http://{t}"), target);
    }
    if let Some(title) = strip_prefix_ci(t, "window:") {
        let mut spec = resolved(TargetKind::Gui, title, target)?;
        spec.window_title = Some(title.to_string());
        return Ok(spec);
    }
    if lower.ends_with(".exe") {
        return resolved(TargetKind::Gui, t, target);
    }
    if let Some(command) = strip_prefix_ci(t, "tui:") {
        return resolved(TargetKind::Tui, command, target);
    }
    let framework = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| TERMINAL_FRAMEWORKS.contains(&token));
    if framework {
        return resolved(TargetKind::Tui, t, target);
    }
    if let Some(command) = strip_prefix_ci(t, "cli:") {
        return resolved(TargetKind::Cli, command, target);
    }
    resolved(TargetKind::Cli, t, target)
}

/// Find a development server accepting connections on localhost.
///
/// Each port gets `wait` to accept; the first that does is returned as an
/// `http://localhost:<port>` URL.
pub async fn detect_running_server(ports: &[u16], wait: Duration) -> Option<String> {
    for &port in ports {
        let connect = TcpStream::connect(("127.0.0.1", port));
        if let Ok(Ok(_)) = tokio::time::timeout(wait, connect).await {
            tracing::debug!(port, "development server found");
            return Some(format!("http://localhost:{port}"));
        }
    }
    None
}
