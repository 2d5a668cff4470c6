//! In-memory ports and a ready-made context for unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Error;
use crate::ports::filesystem::FsError;
use crate::ports::{
    BrowserDriver, Clock, DriverAction, DriverFuture, FileSystem, HeadlessBrowser, HeadlessFuture,
    IdGenerator, OracleClient, OracleFuture, OracleRequest, OracleResponse, WindowCapture,
    WindowFuture,
};

/// Smallest byte string the tests treat as a PNG.
pub(crate) const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Filesystem kept in a map.
#[derive(Default)]
pub(crate) struct MemFs {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

fn not_found(path: &Path) -> FsError {
    format!("file not found: {}", path.display()).into()
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let bytes = self.read_bytes(path)?;
        Ok(String::from_utf8(bytes)?)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.files.lock().unwrap().get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        self.write_bytes(path, contents.as_bytes())
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut files = self.files.lock().unwrap();
        let bytes = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), bytes);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.files.lock().unwrap().remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let files = self.files.lock().unwrap();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Clock that advances one second per reading, from 2024-05-01T12:00:00Z.
#[derive(Default)]
pub(crate) struct TickingClock {
    ticks: AtomicI64,
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(tick)
    }
}

/// Ids `cap-0001`, `cap-0002`, ...
#[derive(Default)]
pub(crate) struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn generate_id(&self) -> String {
        format!("cap-{:04}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Oracle that answers from a script and remembers what it was asked.
#[derive(Clone, Default)]
pub(crate) struct ScriptedOracle {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl ScriptedOracle {
    pub(crate) fn replying<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        let oracle = Self::default();
        oracle.replies.lock().unwrap().extend(replies.into_iter().map(|r| Ok(r.to_string())));
        oracle
    }

    pub(crate) fn failing(message: &str) -> Self {
        let oracle = Self::default();
        oracle.replies.lock().unwrap().push_back(Err(message.to_string()));
        oracle
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> Option<OracleRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl OracleClient for ScriptedOracle {
    fn judge(&self, request: &OracleRequest) -> OracleFuture<'_> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            match reply {
                Some(Ok(text)) => {
                    Ok(OracleResponse { text, prompt_tokens: 100, completion_tokens: 50 })
                }
                Some(Err(message)) => Err(Error::OracleUnavailable(message)),
                None => Err(Error::OracleUnavailable("script exhausted".into())),
            }
        })
    }
}

/// Browser driver that logs actions. Selectors containing `missing` fail.
#[derive(Clone, Default)]
pub(crate) struct FakeDriver {
    log: Arc<Mutex<Vec<String>>>,
    opened: Arc<AtomicU64>,
}

impl FakeDriver {
    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn note(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl BrowserDriver for FakeDriver {
    fn is_available(&self) -> DriverFuture<'_, bool> {
        Box::pin(async { Ok(true) })
    }

    fn open<'a>(&'a self, url: &'a str, _width: u32, _height: u32) -> DriverFuture<'a, String> {
        Box::pin(async move {
            self.note(format!("open {url}"));
            Ok(format!("s{}", self.opened.fetch_add(1, Ordering::SeqCst) + 1))
        })
    }

    fn perform<'a>(&'a self, _session: &'a str, action: &'a DriverAction) -> DriverFuture<'a, ()> {
        Box::pin(async move {
            let (entry, selector) = match action {
                DriverAction::Navigate(url) => (format!("navigate {url}"), ""),
                DriverAction::Click(s) => (format!("click {s}"), s.as_str()),
                DriverAction::Input { selector, value } => {
                    (format!("input {selector}={value}"), selector.as_str())
                }
                DriverAction::Hover(s) => (format!("hover {s}"), s.as_str()),
                DriverAction::Scroll(s) => (format!("scroll {s}"), s.as_str()),
            };
            if selector.contains("missing") {
                return Err(Error::CaptureFailed {
                    target: "fake".into(),
                    reason: format!("no such element: {selector}"),
                });
            }
            self.note(entry);
            Ok(())
        })
    }

    fn screenshot<'a>(&'a self, _session: &'a str) -> DriverFuture<'a, Vec<u8>> {
        Box::pin(async { Ok(PNG.to_vec()) })
    }

    fn close<'a>(&'a self, session: &'a str) -> DriverFuture<'a, ()> {
        Box::pin(async move {
            self.note(format!("close {session}"));
            Ok(())
        })
    }
}

/// Headless browser that always returns [`PNG`].
pub(crate) struct FakeHeadless;

impl HeadlessBrowser for FakeHeadless {
    fn is_available(&self) -> bool {
        true
    }

    fn screenshot<'a>(&'a self, _url: &'a str, _width: u32, _height: u32) -> HeadlessFuture<'a> {
        Box::pin(async { Ok(PNG.to_vec()) })
    }
}

/// Headless browser that fails with scripted errors, then returns [`PNG`].
#[derive(Clone, Default)]
pub(crate) struct FlakyHeadless {
    failures: Arc<Mutex<VecDeque<Error>>>,
    attempts: Arc<AtomicU64>,
}

impl FlakyHeadless {
    pub(crate) fn failing_with(failures: impl IntoIterator<Item = Error>) -> Self {
        let headless = Self::default();
        headless.failures.lock().unwrap().extend(failures);
        headless
    }

    pub(crate) fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl HeadlessBrowser for FlakyHeadless {
    fn is_available(&self) -> bool {
        true
    }

    fn screenshot<'a>(&'a self, _url: &'a str, _width: u32, _height: u32) -> HeadlessFuture<'a> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().unwrap().pop_front();
        Box::pin(async move {
            match failure {
                Some(err) => Err(err),
                None => Ok(PNG.to_vec()),
            }
        })
    }
}

/// Window grabber that always returns [`PNG`].
pub(crate) struct FakeWindow;

impl WindowCapture for FakeWindow {
    fn is_available(&self) -> bool {
        true
    }

    fn capture<'a>(&'a self, _title: &'a str) -> WindowFuture<'a> {
        Box::pin(async { Ok(PNG.to_vec()) })
    }
}

/// Configuration rooted at `/project` with no settle delays.
pub(crate) fn test_config() -> Config {
    Config {
        store_root: PathBuf::from("/project/.glimpse"),
        task_dir: PathBuf::from("/project/.claude"),
        settle_ms: 0,
        wait_before_ms: 0,
        ..Config::default()
    }
}

/// Offline context with in-memory fs, deterministic clock and ids, and a
/// headless screenshotter.
pub(crate) fn test_context() -> ServiceContext {
    let mut ctx = ServiceContext::offline(test_config());
    ctx.fs = Box::new(MemFs::new());
    ctx.clock = Box::new(TickingClock::default());
    ctx.id_gen = Box::new(SequentialIds::default());
    ctx.headless = Box::new(FakeHeadless);
    ctx
}
