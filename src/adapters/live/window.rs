//! Live adapter for the `WindowCapture` port using X11 tooling.
//!
//! Requires `DISPLAY`, `xdotool` and ImageMagick's `import`. The window is
//! located by name and grabbed by id, so it is never raised or focused.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::ports::window::{WindowCapture, WindowFuture};

/// Per-tool budget; the caller applies the overall capture timeout.
const TOOL_TIMEOUT: Duration = Duration::from_secs(15);

/// Captures X11 windows with `xdotool search` + `import -window`.
pub struct X11WindowCapture;

async fn run_tool(program: &str, args: &[&str]) -> Result<Vec<u8>> {
    let output = tokio::time::timeout(
        TOOL_TIMEOUT,
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| Error::CaptureTimeout { target: program.to_string(), after: TOOL_TIMEOUT })?
    .map_err(|e| Error::AdapterUnavailable {
        adapter: "gui".into(),
        reason: format!("failed to execute {program}: {e}"),
    })?;

    if !output.status.success() {
        return Err(Error::CaptureFailed {
            target: program.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

impl X11WindowCapture {
    async fn grab(&self, title: &str) -> Result<Vec<u8>> {
        let ids = run_tool("xdotool", &["search", "--onlyvisible", "--name", title])
            .await
            .map_err(|err| match err {
                Error::CaptureFailed { .. } => Error::CaptureFailed {
                    target: title.to_string(),
                    reason: "no visible window with that title".into(),
                },
                other => other,
            })?;
        let ids = String::from_utf8_lossy(&ids);
        let window_id = ids.lines().map(str::trim).find(|l| !l.is_empty()).ok_or_else(|| {
            Error::CaptureFailed {
                target: title.to_string(),
                reason: "no visible window with that title".into(),
            }
        })?;

        let png = run_tool("import", &["-window", window_id, "png:-"]).await?;
        if png.is_empty() {
            return Err(Error::CaptureFailed {
                target: title.to_string(),
                reason: "import produced no image".into(),
            });
        }
        Ok(png)
    }
}

impl WindowCapture for X11WindowCapture {
    fn is_available(&self) -> bool {
        std::env::var_os("DISPLAY").is_some_and(|d| !d.is_empty())
    }

    fn capture<'a>(&'a self, title: &'a str) -> WindowFuture<'a> {
        Box::pin(self.grab(title))
    }
}
