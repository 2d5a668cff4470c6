//! Terminal host port for driving terminal UIs.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Boxed future returned by [`TerminalHost`] methods.
pub type TerminalFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Hosts a long-running terminal program and exposes its screen as text.
pub trait TerminalHost: Send + Sync {
    /// Start `command` in the background and return a handle to it.
    fn spawn<'a>(&'a self, command: &'a str) -> TerminalFuture<'a, String>;

    /// Return everything the program has written so far.
    fn snapshot<'a>(&'a self, handle: &'a str) -> TerminalFuture<'a, String>;

    /// Write keystrokes to the program's input.
    fn send_input<'a>(&'a self, handle: &'a str, keys: &'a str) -> TerminalFuture<'a, ()>;

    /// Terminate the program and forget the handle.
    fn close<'a>(&'a self, handle: &'a str) -> TerminalFuture<'a, ()>;
}
