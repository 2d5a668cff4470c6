//! Desktop window capture port.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Boxed future returned by [`WindowCapture::capture`].
pub type WindowFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Captures a desktop window by title without raising or focusing it.
pub trait WindowCapture: Send + Sync {
    /// Whether a display and the capture tooling are present.
    fn is_available(&self) -> bool;

    /// Capture the first window whose title contains `title` as a PNG.
    fn capture<'a>(&'a self, title: &'a str) -> WindowFuture<'a>;
}
