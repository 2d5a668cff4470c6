//! Live adapter for the `TerminalHost` port backed by piped child processes.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::process::ProcessGroup;
use crate::error::Error;
use crate::ports::terminal::{TerminalFuture, TerminalHost};

/// CSI and OSC escape sequences emitted by terminal UI frameworks.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07]*(?:\x07|\x1b\\)|\x1b[()][0-9A-Za-z]")
        .expect("valid ansi regex")
});

struct Hosted {
    command: String,
    child: Child,
    group: ProcessGroup,
    stdin: Option<ChildStdin>,
    screen: Arc<std::sync::Mutex<String>>,
    readers: Vec<JoinHandle<()>>,
}

/// Runs terminal programs with piped stdio and accumulates their output.
///
/// Each program runs in its own process group; closing the session or
/// dropping the host kills the group, including anything the program
/// started itself.
#[derive(Default)]
pub struct PipedTerminalHost {
    next: AtomicU64,
    hosted: Mutex<HashMap<String, Hosted>>,
}

impl PipedTerminalHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn pump<R>(mut reader: R, screen: Arc<std::sync::Mutex<String>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]);
                    if let Ok(mut screen) = screen.lock() {
                        screen.push_str(&chunk);
                    }
                }
            }
        }
    })
}

fn unknown(handle: &str) -> Error {
    Error::CaptureFailed { target: handle.to_string(), reason: "no such terminal session".into() }
}

/// Strip escape sequences and carriage returns from raw terminal output.
#[must_use]
pub fn clean_screen(raw: &str) -> String {
    ANSI_ESCAPE.replace_all(raw, "").replace('\r', "")
}

impl TerminalHost for PipedTerminalHost {
    fn spawn<'a>(&'a self, command: &'a str) -> TerminalFuture<'a, String> {
        Box::pin(async move {
            let mut child = Command::new("sh")
                .arg("-c")
                .arg(command)
                .env("TERM", "dumb")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .process_group(0)
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| Error::CaptureFailed {
                    target: command.to_string(),
                    reason: format!("failed to spawn: {e}"),
                })?;

            let screen = Arc::new(std::sync::Mutex::new(String::new()));
            let mut readers = Vec::new();
            if let Some(stdout) = child.stdout.take() {
                readers.push(pump(stdout, Arc::clone(&screen)));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(pump(stderr, Arc::clone(&screen)));
            }
            let stdin = child.stdin.take();
            let group = ProcessGroup::led_by(child.id());

            let handle = format!("term-{}", self.next.fetch_add(1, Ordering::Relaxed) + 1);
            tracing::debug!(%handle, %command, "terminal program started");
            self.hosted.lock().await.insert(
                handle.clone(),
                Hosted { command: command.to_string(), child, group, stdin, screen, readers },
            );
            Ok(handle)
        })
    }

    fn snapshot<'a>(&'a self, handle: &'a str) -> TerminalFuture<'a, String> {
        Box::pin(async move {
            let hosted = self.hosted.lock().await;
            let entry = hosted.get(handle).ok_or_else(|| unknown(handle))?;
            let raw = entry.screen.lock().map(|s| s.clone()).unwrap_or_default();
            Ok(clean_screen(&raw))
        })
    }

    fn send_input<'a>(&'a self, handle: &'a str, keys: &'a str) -> TerminalFuture<'a, ()> {
        Box::pin(async move {
            let mut hosted = self.hosted.lock().await;
            let entry = hosted.get_mut(handle).ok_or_else(|| unknown(handle))?;
            let command = entry.command.clone();
            let stdin = entry.stdin.as_mut().ok_or_else(|| Error::CaptureFailed {
                target: command.clone(),
                reason: "program input is closed".into(),
            })?;
            stdin.write_all(keys.as_bytes()).await.map_err(|e| Error::CaptureFailed {
                target: command.clone(),
                reason: format!("failed to send input: {e}"),
            })?;
            stdin
                .flush()
                .await
                .map_err(|e| Error::CaptureFailed { target: command, reason: e.to_string() })
        })
    }

    fn close<'a>(&'a self, handle: &'a str) -> TerminalFuture<'a, ()> {
        Box::pin(async move {
            let Some(mut entry) = self.hosted.lock().await.remove(handle) else {
                return Err(unknown(handle));
            };
            drop(entry.stdin.take());
            entry.group.kill();
            // Already exited is fine.
            let _ = entry.child.kill().await;
            for reader in entry.readers {
                reader.abort();
            }
            tracing::debug!(%handle, "terminal program stopped");
            Ok(())
        })
    }
}
