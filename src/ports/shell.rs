//! Shell executor port for running external commands.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by [`ShellExecutor::run`].
pub type ShellFuture<'a> = Pin<
    Box<
        dyn Future<Output = Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>>>
            + Send
            + 'a,
    >,
>;

/// The output of a shell command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutput {
    /// The exit code of the process (`-1` when killed by a signal).
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

/// Executes shell commands.
///
/// Dropping the returned future must terminate the child process, so a
/// caller-side timeout never leaves an orphan behind.
pub trait ShellExecutor: Send + Sync {
    /// Runs a command string in the system shell and returns its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or fails to execute.
    fn run(&self, command: &str) -> ShellFuture<'_>;
}
