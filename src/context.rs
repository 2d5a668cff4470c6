//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::adapters::live::{
    clock::LiveClock, driver::WebDriverClient, filesystem::LiveFileSystem,
    headless::ChromiumHeadless, id_gen::LiveIdGenerator, oracle::LiveOracleClient,
    shell::LiveShellExecutor, terminal::PipedTerminalHost, window::X11WindowCapture,
};
use crate::adapters::recording::{
    RecordingClock, RecordingIdGenerator, RecordingOracleClient, SharedRecorder,
};
use crate::adapters::replaying::{ReplayingClock, ReplayingIdGenerator, ReplayingOracleClient};
use crate::capture::SessionRegistry;
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Config;
use crate::error::Error;
use crate::ports::{
    BrowserDriver, Clock, DriverAction, DriverFuture, FileSystem, HeadlessBrowser, HeadlessFuture,
    IdGenerator, OracleClient, OracleFuture, OracleRequest, ShellExecutor, TerminalFuture,
    TerminalHost, WindowCapture, WindowFuture,
};

/// Bundles all port trait objects, the session registry and configuration.
///
/// Constructors wire up different adapter implementations (live, recording,
/// replaying, offline). Every engine operation receives one of these.
pub struct ServiceContext {
    /// Clock for capture timestamps and baseline names.
    pub clock: Box<dyn Clock>,
    /// Filesystem for the task documents and the store.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for capture identifiers.
    pub id_gen: Box<dyn IdGenerator>,
    /// Shell executor for command-output captures.
    pub shell: Box<dyn ShellExecutor>,
    /// Browser automation driver.
    pub driver: Box<dyn BrowserDriver>,
    /// Headless screenshotter used as the webapp fallback.
    pub headless: Box<dyn HeadlessBrowser>,
    /// Terminal host for TUI targets.
    pub terminal: Box<dyn TerminalHost>,
    /// Desktop window grabber.
    pub window: Box<dyn WindowCapture>,
    /// Verification oracle.
    pub oracle: Box<dyn OracleClient>,
    /// Open capture sessions.
    pub sessions: SessionRegistry,
    /// Resolved configuration.
    pub config: Config,
    /// Optional cassette recorder; written to disk on drop.
    recorder: Option<SharedRecorder>,
}

impl ServiceContext {
    /// Creates a live context with real adapters for every port.
    #[must_use]
    pub fn live(config: Config) -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator::new()),
            shell: Box::new(LiveShellExecutor),
            driver: Box::new(WebDriverClient::new(&config.webdriver_url)),
            headless: Box::new(ChromiumHeadless::new(&config.browser_binary)),
            terminal: Box::new(PipedTerminalHost::new()),
            window: Box::new(X11WindowCapture),
            oracle: Box::new(LiveOracleClient::new()),
            sessions: SessionRegistry::new(),
            config,
            recorder: None,
        }
    }

    /// Creates a live context that records oracle, clock and id interactions
    /// into a cassette written to `path` when the context is dropped.
    ///
    /// This is the developer-only mechanism behind `GLIMPSE_RECORD`.
    #[must_use]
    pub fn recording(path: &Path, config: Config) -> Self {
        let recorder: SharedRecorder =
            Arc::new(Mutex::new(CassetteRecorder::new(path, "glimpse-session")));
        let mut ctx = Self::live(config);
        ctx.oracle = Box::new(RecordingOracleClient::new(
            std::mem::replace(&mut ctx.oracle, Box::new(Unavailable)),
            Arc::clone(&recorder),
        ));
        ctx.clock = Box::new(RecordingClock::new(
            std::mem::replace(&mut ctx.clock, Box::new(LiveClock)),
            Arc::clone(&recorder),
        ));
        ctx.id_gen = Box::new(RecordingIdGenerator::new(
            std::mem::replace(&mut ctx.id_gen, Box::new(LiveIdGenerator::new())),
            Arc::clone(&recorder),
        ));
        ctx.recorder = Some(recorder);
        ctx
    }

    /// Creates a replaying context from a cassette file.
    ///
    /// Oracle, clock and id interactions are served from the cassette; the
    /// filesystem is live and capture backends are unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path, config: Config) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette = Cassette::from_yaml(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        let replayer = Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));

        let mut ctx = Self::offline(config);
        ctx.clock = Box::new(ReplayingClock::new(Arc::clone(&replayer)));
        ctx.id_gen = Box::new(ReplayingIdGenerator::new(Arc::clone(&replayer)));
        ctx.oracle = Box::new(ReplayingOracleClient::new(replayer));
        Ok(ctx)
    }

    /// Creates a context with live clock, filesystem, ids and shell, but no
    /// capture backends or oracle. Each of those reports itself unavailable.
    #[must_use]
    pub fn offline(config: Config) -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator::new()),
            shell: Box::new(LiveShellExecutor),
            driver: Box::new(Unavailable),
            headless: Box::new(Unavailable),
            terminal: Box::new(Unavailable),
            window: Box::new(Unavailable),
            oracle: Box::new(Unavailable),
            sessions: SessionRegistry::new(),
            config,
            recorder: None,
        }
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        let Ok(recorder) = recorder.lock() else {
            tracing::warn!("cassette recorder poisoned; nothing written");
            return;
        };
        match recorder.write() {
            Ok(path) => tracing::info!(
                path = %path.display(),
                interactions = recorder.len(),
                "cassette written"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to write cassette"),
        }
    }
}

// --- Stand-in for ports with no backend in this context ---

struct Unavailable;

fn missing(adapter: &str) -> Error {
    Error::AdapterUnavailable {
        adapter: adapter.to_string(),
        reason: "not available in this context".to_string(),
    }
}

impl BrowserDriver for Unavailable {
    fn is_available(&self) -> DriverFuture<'_, bool> {
        Box::pin(async { Ok(false) })
    }
    fn open<'a>(&'a self, _url: &'a str, _width: u32, _height: u32) -> DriverFuture<'a, String> {
        Box::pin(async { Err(missing("browser")) })
    }
    fn perform<'a>(&'a self, _session: &'a str, _action: &'a DriverAction) -> DriverFuture<'a, ()> {
        Box::pin(async { Err(missing("browser")) })
    }
    fn screenshot<'a>(&'a self, _session: &'a str) -> DriverFuture<'a, Vec<u8>> {
        Box::pin(async { Err(missing("browser")) })
    }
    fn close<'a>(&'a self, _session: &'a str) -> DriverFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl HeadlessBrowser for Unavailable {
    fn is_available(&self) -> bool {
        false
    }
    fn screenshot<'a>(&'a self, _url: &'a str, _width: u32, _height: u32) -> HeadlessFuture<'a> {
        Box::pin(async { Err(missing("headless")) })
    }
}

impl TerminalHost for Unavailable {
    fn spawn<'a>(&'a self, _command: &'a str) -> TerminalFuture<'a, String> {
        Box::pin(async { Err(missing("tui")) })
    }
    fn snapshot<'a>(&'a self, _handle: &'a str) -> TerminalFuture<'a, String> {
        Box::pin(async { Err(missing("tui")) })
    }
    fn send_input<'a>(&'a self, _handle: &'a str, _keys: &'a str) -> TerminalFuture<'a, ()> {
        Box::pin(async { Err(missing("tui")) })
    }
    fn close<'a>(&'a self, _handle: &'a str) -> TerminalFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl WindowCapture for Unavailable {
    fn is_available(&self) -> bool {
        false
    }
    fn capture<'a>(&'a self, _title: &'a str) -> WindowFuture<'a> {
        Box::pin(async { Err(missing("gui")) })
    }
}

impl OracleClient for Unavailable {
    fn judge(&self, _request: &OracleRequest) -> OracleFuture<'_> {
        Box::pin(async { Err(Error::OracleUnavailable("no oracle configured".into())) })
    }
}
