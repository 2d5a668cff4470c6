//! Engine configuration.
//!
//! Values are resolved in three layers: built-in defaults, an optional
//! `<root>/.glimpse/config.yaml`, then `GLIMPSE_*` environment variables
//! (a `.env` file in the working directory is honored). The resolved
//! [`Config`] is passed into the engine explicitly.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default model used for the verification oracle.
pub const DEFAULT_ORACLE_MODEL: &str = "claude-sonnet-4-20250514";

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding captures, baselines and cassettes.
    pub store_root: PathBuf,
    /// Directory scanned for task documents.
    pub task_dir: PathBuf,
    /// Budget for a single capture, in milliseconds.
    pub capture_timeout_ms: u64,
    /// Budget for one oracle call, in milliseconds.
    pub oracle_timeout_ms: u64,
    /// Delay after an event before the capture is taken, in milliseconds.
    pub settle_ms: u64,
    /// Delay before a single-shot capture, in milliseconds.
    pub wait_before_ms: u64,
    /// Viewport width for browser captures.
    pub width: u32,
    /// Viewport height for browser captures.
    pub height: u32,
    /// Text captures longer than this are truncated in oracle prompts.
    pub text_limit: usize,
    /// Oracle model identifier.
    pub oracle_model: String,
    /// Maximum tokens the oracle may generate.
    pub oracle_max_tokens: u32,
    /// W3C WebDriver endpoint used by the browser adapter.
    pub webdriver_url: String,
    /// Browser binary used by the headless screenshot adapter.
    pub browser_binary: String,
    /// Allow webapp targets to fall back to the headless adapter when the
    /// automation driver is unreachable.
    pub allow_headless_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(".glimpse"),
            task_dir: PathBuf::from(".claude"),
            capture_timeout_ms: 30_000,
            oracle_timeout_ms: 180_000,
            settle_ms: 300,
            wait_before_ms: 500,
            width: 1280,
            height: 720,
            text_limit: 2000,
            oracle_model: DEFAULT_ORACLE_MODEL.to_string(),
            oracle_max_tokens: 4096,
            webdriver_url: "http://localhost:9515".to_string(),
            browser_binary: "chromium".to_string(),
            allow_headless_fallback: true,
        }
    }
}

impl Config {
    /// Load configuration for a project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config file or an environment
    /// override cannot be parsed.
    pub fn load(root: &Path) -> Result<Self> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();

        let file = root.join(".glimpse").join("config.yaml");
        let mut config = if file.exists() {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| Error::Config(format!("{}: {e}", file.display())))?;
            Self::from_yaml(&text)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok())?;
        if config.store_root.is_relative() {
            config.store_root = root.join(&config.store_root);
        }
        if config.task_dir.is_relative() {
            config.task_dir = root.join(&config.task_dir);
        }
        Ok(config)
    }

    /// Parse a YAML config document, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::Config(format!("config.yaml: {e}")))
    }

    /// Apply `GLIMPSE_*` overrides from the given lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("GLIMPSE_STORE") {
            self.store_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("GLIMPSE_TASK_DIR") {
            self.task_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GLIMPSE_CAPTURE_TIMEOUT_MS") {
            self.capture_timeout_ms = parse_number("GLIMPSE_CAPTURE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("GLIMPSE_ORACLE_TIMEOUT_MS") {
            self.oracle_timeout_ms = parse_number("GLIMPSE_ORACLE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("GLIMPSE_SETTLE_MS") {
            self.settle_ms = parse_number("GLIMPSE_SETTLE_MS", &v)?;
        }
        if let Some(v) = lookup("GLIMPSE_ORACLE_MODEL") {
            self.oracle_model = v;
        }
        if let Some(v) = lookup("GLIMPSE_WEBDRIVER_URL") {
            self.webdriver_url = v;
        }
        if let Some(v) = lookup("GLIMPSE_BROWSER") {
            self.browser_binary = v;
        }
        if let Some(v) = lookup("GLIMPSE_HEADLESS_FALLBACK") {
            self.allow_headless_fallback =
                matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(())
    }

    /// Capture budget as a [`Duration`].
    #[must_use]
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Oracle budget as a [`Duration`].
    #[must_use]
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|e| Error::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_overrides_only_given_fields() {
        let config = Config::from_yaml("capture_timeout_ms: 5000\nwidth: 800\n").unwrap();
        assert_eq!(config.capture_timeout(), Duration::from_secs(5));
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 720);
        assert_eq!(config.oracle_model, DEFAULT_ORACLE_MODEL);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let err = Config::from_yaml("width: [not, a, number]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("GLIMPSE_CAPTURE_TIMEOUT_MS", "250"),
            ("GLIMPSE_HEADLESS_FALLBACK", "off"),
            ("GLIMPSE_WEBDRIVER_URL", "http://127.0.0.1:4444"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(config.capture_timeout_ms, 250);
        assert!(!config.allow_headless_fallback);
        assert_eq!(config.webdriver_url, "http://127.0.0.1:4444");
    }

    #[test]
    fn bad_numeric_env_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "GLIMPSE_SETTLE_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GLIMPSE_SETTLE_MS"));
    }

    #[test]
    fn load_resolves_relative_paths_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".glimpse")).unwrap();
        std::fs::write(dir.path().join(".glimpse/config.yaml"), "settle_ms: 0\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.settle_ms, 0);
        assert!(config.task_dir.starts_with(dir.path()));
    }
}
