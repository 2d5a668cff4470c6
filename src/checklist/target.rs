//! What a task document should be verified against.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:[-*][ \t]+)?\[(webapp|gui|tui|cli|window_title)\]:[ \t]*(.+?)[ \t]*$")
        .expect("valid marker regex")
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)>\]"'`]+"#).expect("valid url regex"));
static WEB_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blocalhost\b|https?://|\bbrowser\b|\bweb ?page\b").expect("valid regex")
});
static TERMINAL_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:terminal|console|command line|tui)\b").expect("valid regex")
});
static DESKTOP_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.exe\b|\bwindow\b|\bgui\b|\bdesktop\b").expect("valid regex")
});
static EXE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^\s`'\x22]+\.exe\b").expect("valid exe regex"));

/// Kind of application under verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A page served over HTTP.
    Webapp,
    /// A desktop window.
    Gui,
    /// A full-screen terminal program.
    Tui,
    /// A command whose output is the evidence.
    Cli,
    /// Not determined.
    Unknown,
}

impl TargetKind {
    /// Lowercase marker name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webapp => "webapp",
            Self::Gui => "gui",
            Self::Tui => "tui",
            Self::Cli => "cli",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved or partially-resolved verification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Application kind.
    pub kind: TargetKind,
    /// URL, command line or window title. Empty when only the kind is known.
    pub locator: String,
    /// Title of the window to capture, from a `[window_title]:` marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
}

impl TargetSpec {
    /// Build a target from parts.
    #[must_use]
    pub fn new(kind: TargetKind, locator: impl Into<String>) -> Self {
        Self { kind, locator: locator.into(), window_title: None }
    }

    /// Whether a capture adapter can act on this target.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.kind != TargetKind::Unknown && !self.locator.trim().is_empty()
    }

    /// Derive a target from a task document's text.
    ///
    /// Explicit markers win, in the order webapp, gui, tui, cli. Without a
    /// marker the content is scanned for web, terminal and desktop words.
    #[must_use]
    pub fn from_document(text: &str) -> Option<Self> {
        let mut window_title = None;
        let mut markers: Vec<(TargetKind, String)> = Vec::new();
        for caps in MARKER.captures_iter(text) {
            let value = caps[2].to_string();
            match caps[1].to_ascii_lowercase().as_str() {
                "webapp" => markers.push((TargetKind::Webapp, value)),
                "gui" => markers.push((TargetKind::Gui, value)),
                "tui" => markers.push((TargetKind::Tui, value)),
                "cli" => markers.push((TargetKind::Cli, value)),
                _ => {
                    window_title.get_or_insert(value);
                }
            }
        }

        let explicit = [TargetKind::Webapp, TargetKind::Gui, TargetKind::Tui, TargetKind::Cli]
            .into_iter()
            .find_map(|kind| markers.iter().find(|(k, _)| *k == kind).cloned());
        if let Some((kind, locator)) = explicit {
            return Some(Self { kind, locator, window_title });
        }

        let inferred = if WEB_WORDS.is_match(text) {
            let url = URL.find(text).map_or("", |m| m.as_str());
            Self::new(TargetKind::Webapp, url.trim_end_matches(['.', ',', ';']))
        } else if TERMINAL_WORDS.is_match(text) {
            Self::new(TargetKind::Tui, "")
        } else if DESKTOP_WORDS.is_match(text) {
            Self::new(TargetKind::Gui, EXE.find(text).map_or("", |m| m.as_str()))
        } else {
            return window_title.map(|title| Self {
                kind: TargetKind::Gui,
                locator: title.clone(),
                window_title: Some(title),
            });
        };
        Some(Self { window_title, ..inferred })
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locator.is_empty() {
            write!(f, "{} (no locator)", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.locator)
        }
    }
}
