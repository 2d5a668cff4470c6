//! Capture adapter abstraction.
//!
//! Every capture backend implements [`CaptureAdapter`]; [`select_adapter`]
//! picks one for a [`TargetSpec`], falling back from the browser driver to
//! the headless screenshotter for single shots when allowed.

pub mod adapters;
pub mod detect;
pub mod event;
pub mod session;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::checklist::{TargetKind, TargetSpec};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

pub use detect::{detect, detect_running_server, AdapterKind, DEV_SERVER_PORTS};
pub use event::CaptureEvent;
pub use session::{bounded, run_sequence, Session, SessionHandle, SessionLease, SessionRegistry};

/// Boxed future returned by [`CaptureAdapter`] methods.
pub type CaptureFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Captured evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePayload {
    /// PNG image bytes.
    Image(Vec<u8>),
    /// Terminal or command output.
    Text(String),
}

impl CapturePayload {
    /// MIME type of the payload.
    #[must_use]
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Image(_) => "image/png",
            Self::Text(_) => "text/plain",
        }
    }

    /// File extension used by the store.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image(_) => "png",
            Self::Text(_) => "txt",
        }
    }

    /// Raw bytes as stored on disk.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Image(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Rebuild a payload from stored bytes and its MIME type.
    #[must_use]
    pub fn from_stored(mime: &str, bytes: Vec<u8>) -> Self {
        if mime.starts_with("text/") {
            Self::Text(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            Self::Image(bytes)
        }
    }
}

/// One immutable capture. Only adapters and the store construct these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    id: String,
    payload: CapturePayload,
    target: TargetSpec,
    event: String,
    captured_at: DateTime<Utc>,
}

impl Capture {
    /// Stamp a fresh capture with an id and time from the context.
    pub(crate) fn new(
        ctx: &ServiceContext,
        payload: CapturePayload,
        target: &TargetSpec,
        event: impl Into<String>,
    ) -> Self {
        Self {
            id: ctx.id_gen.generate_id(),
            payload,
            target: target.clone(),
            event: event.into(),
            captured_at: ctx.clock.now(),
        }
    }

    /// Rebuild a persisted capture.
    pub(crate) fn restore(
        id: String,
        payload: CapturePayload,
        target: TargetSpec,
        event: String,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self { id, payload, target, event, captured_at }
    }

    /// Generated identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Evidence.
    #[must_use]
    pub fn payload(&self) -> &CapturePayload {
        &self.payload
    }

    /// MIME type of the payload.
    #[must_use]
    pub fn mime(&self) -> &'static str {
        self.payload.mime()
    }

    /// Target the capture was taken from.
    #[must_use]
    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    /// Event that produced the capture.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// When the capture was taken.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Knobs for a single capture or a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Budget for each adapter call.
    pub timeout: Duration,
    /// Delay before a single-shot capture.
    pub wait_before: Duration,
    /// Delay after an event before capturing.
    pub settle: Duration,
    /// Viewport width.
    pub width: u32,
    /// Viewport height.
    pub height: u32,
}

impl CaptureOptions {
    /// Options from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.capture_timeout(),
            wait_before: Duration::from_millis(config.wait_before_ms),
            settle: Duration::from_millis(config.settle_ms),
            width: config.width,
            height: config.height,
        }
    }

    /// Override the per-call budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A capture backend.
///
/// Implementations bound every call by `options.timeout` and fail with
/// [`Error::CaptureTimeout`] instead of hanging. They never move focus to
/// the captured application.
pub trait CaptureAdapter: Send + Sync {
    /// Which mechanism this is.
    fn kind(&self) -> AdapterKind;

    /// Take one capture without keeping anything open.
    fn capture<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture>;

    /// Open a session for a multi-event sequence.
    fn start_session<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Session>;

    /// Perform `event` in `session`, let it settle, and capture.
    fn capture_on_event<'a>(
        &'a self,
        session: &'a Session,
        event: &'a CaptureEvent,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture>;

    /// Release the session's backend resources.
    fn end_session(&self, session: Session) -> CaptureFuture<'_, ()>;
}

/// Pick the adapter for `target`.
///
/// An explicit choice is honored as long as its backend is present. For
/// webapps the browser driver is preferred; single shots fall back to the
/// headless screenshotter when `allow_headless_fallback` is set, event
/// sequences never do.
///
/// # Errors
///
/// Returns [`Error::TargetUnresolved`] for targets without kind or locator
/// and [`Error::AdapterUnavailable`] when no suitable backend is present.
pub async fn select_adapter<'a>(
    ctx: &'a ServiceContext,
    target: &TargetSpec,
    explicit: Option<AdapterKind>,
    needs_events: bool,
) -> Result<Box<dyn CaptureAdapter + 'a>> {
    if !target.is_resolved() {
        return Err(Error::TargetUnresolved(target.to_string()));
    }
    let kind = match explicit {
        Some(kind) => kind,
        None => AdapterKind::for_target(target.kind)
            .ok_or_else(|| Error::TargetUnresolved(target.to_string()))?,
    };

    let kind = match kind {
        AdapterKind::Browser => {
            if ctx.driver.is_available().await? {
                AdapterKind::Browser
            } else if explicit.is_none()
                && !needs_events
                && target.kind == TargetKind::Webapp
                && ctx.config.allow_headless_fallback
            {
                tracing::warn!(
                    endpoint = %ctx.config.webdriver_url,
                    "automation driver unreachable; falling back to headless screenshot"
                );
                AdapterKind::Headless
            } else {
                return Err(Error::AdapterUnavailable {
                    adapter: "browser".into(),
                    reason: format!(
                        "no WebDriver endpoint is ready at {}; start chromedriver or set GLIMPSE_WEBDRIVER_URL",
                        ctx.config.webdriver_url
                    ),
                });
            }
        }
        other => other,
    };

    match kind {
        AdapterKind::Headless if !ctx.headless.is_available() => Err(Error::AdapterUnavailable {
            adapter: "headless".into(),
            reason: format!(
                "browser binary {:?} not found; install Chromium or set GLIMPSE_BROWSER",
                ctx.config.browser_binary
            ),
        }),
        AdapterKind::Gui if !ctx.window.is_available() => Err(Error::AdapterUnavailable {
            adapter: "gui".into(),
            reason: "no X11 display; set DISPLAY and install xdotool and ImageMagick".into(),
        }),
        _ => {
            tracing::debug!(adapter = %kind, target = %target, "capture adapter selected");
            Ok(adapters::build(kind, ctx))
        }
    }
}
