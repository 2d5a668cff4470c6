//! Browser automation driver port.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Boxed future returned by [`BrowserDriver`] methods.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A page interaction performed inside a driver session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverAction {
    /// Load a URL in the current window.
    Navigate(String),
    /// Click the first element matching a CSS selector.
    Click(String),
    /// Type a value into the first element matching a CSS selector.
    Input {
        /// CSS selector of the field.
        selector: String,
        /// Text to send.
        value: String,
    },
    /// Move the pointer over an element.
    Hover(String),
    /// Scroll an element into view.
    Scroll(String),
}

/// Drives a real browser through an automation protocol.
///
/// Sessions are opaque strings issued by [`BrowserDriver::open`] and must be
/// passed back to [`BrowserDriver::close`] exactly once.
pub trait BrowserDriver: Send + Sync {
    /// Whether the automation endpoint is reachable and ready.
    fn is_available(&self) -> DriverFuture<'_, bool>;

    /// Open a new browser window at `url` with the given viewport.
    fn open<'a>(&'a self, url: &'a str, width: u32, height: u32) -> DriverFuture<'a, String>;

    /// Perform one interaction in an open session.
    fn perform<'a>(&'a self, session: &'a str, action: &'a DriverAction) -> DriverFuture<'a, ()>;

    /// Take a PNG screenshot of the session's current page.
    fn screenshot<'a>(&'a self, session: &'a str) -> DriverFuture<'a, Vec<u8>>;

    /// Close the session and its window.
    fn close<'a>(&'a self, session: &'a str) -> DriverFuture<'a, ()>;
}
