//! Live shell executor using `tokio::process::Command`.

use std::process::Stdio;

use tokio::process::Command;

use super::process::ProcessGroup;
use crate::ports::shell::{ShellExecutor, ShellFuture, ShellOutput};

/// Live shell executor that runs commands via `sh -c`.
///
/// Each command runs in its own process group. The group is killed when the
/// command finishes or the returned future is dropped, so nothing it started
/// in the background outlives the call.
pub struct LiveShellExecutor;

impl ShellExecutor for LiveShellExecutor {
    fn run(&self, command: &str) -> ShellFuture<'_> {
        let command = command.to_string();
        Box::pin(async move {
            let child = Command::new("sh")
                .arg("-c")
                .arg(&command)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .process_group(0)
                .kill_on_drop(true)
                .spawn()?;
            let _group = ProcessGroup::led_by(child.id());
            let output = child.wait_with_output().await?;
            Ok(ShellOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
