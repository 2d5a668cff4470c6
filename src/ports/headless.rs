//! Headless browser port used when no automation driver is reachable.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Boxed future returned by [`HeadlessBrowser::screenshot`].
pub type HeadlessFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Takes one-shot screenshots of a URL without an interactive session.
pub trait HeadlessBrowser: Send + Sync {
    /// Whether the headless browser binary can be launched.
    fn is_available(&self) -> bool;

    /// Render `url` in a fresh headless browser and return a PNG.
    fn screenshot<'a>(&'a self, url: &'a str, width: u32, height: u32) -> HeadlessFuture<'a>;
}
