//! Live adapter for the `HeadlessBrowser` port using headless Chromium.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use super::process::ProcessGroup;
use crate::error::{Error, Result};
use crate::ports::headless::{HeadlessBrowser, HeadlessFuture};

/// Runs `<binary> --headless=new --screenshot=<file> <url>`.
pub struct ChromiumHeadless {
    binary: String,
}

impl ChromiumHeadless {
    /// Create an adapter launching the given browser binary.
    #[must_use]
    pub fn new(binary: &str) -> Self {
        Self { binary: binary.to_string() }
    }
}

fn on_path(binary: &str) -> bool {
    if binary.contains('/') {
        return PathBuf::from(binary).is_file();
    }
    std::env::var_os("PATH")
        .is_some_and(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
}

impl ChromiumHeadless {
    async fn render(&self, url: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let failed = |reason: String| Error::CaptureFailed { target: url.to_string(), reason };
        // Removed when dropped, on every exit path.
        let shot = tempfile::Builder::new()
            .prefix("glimpse-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| failed(format!("cannot create screenshot file: {e}")))?;
        let child = Command::new(&self.binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!("--window-size={width},{height}"))
            .arg(format!("--screenshot={}", shot.path().display()))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::AdapterUnavailable {
                adapter: "headless".into(),
                reason: format!("could not launch {}: {e}", self.binary),
            })?;
        // Browser helpers (renderer, gpu, zygote) share the group.
        let _group = ProcessGroup::led_by(child.id());
        let output = child.wait_with_output().await.map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        let bytes = tokio::fs::read(shot.path())
            .await
            .map_err(|e| failed(format!("screenshot file unreadable: {e}")))?;
        if bytes.is_empty() {
            return Err(failed("browser wrote no screenshot".into()));
        }
        Ok(bytes)
    }
}

impl HeadlessBrowser for ChromiumHeadless {
    fn is_available(&self) -> bool {
        on_path(&self.binary)
    }

    fn screenshot<'a>(&'a self, url: &'a str, width: u32, height: u32) -> HeadlessFuture<'a> {
        Box::pin(self.render(url, width, height))
    }
}
