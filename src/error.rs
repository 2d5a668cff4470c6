//! Error taxonomy for the verification engine.

use std::path::PathBuf;
use std::time::Duration;

/// Convenience alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the engine can surface to a caller.
///
/// Conditions that could lead to a false "completed" mark are always surfaced
/// through one of these variants and never defaulted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document or payload could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// No adapter could be determined for the target.
    #[error("could not resolve a capture target from {0:?}")]
    TargetUnresolved(String),

    /// A required capture backend is not installed or not reachable.
    #[error("{adapter} adapter unavailable: {reason}")]
    AdapterUnavailable {
        /// Adapter that was requested.
        adapter: String,
        /// Actionable description of what is missing.
        reason: String,
    },

    /// A capture did not complete within its time budget.
    #[error("capture of {target} timed out after {}ms", .after.as_millis())]
    CaptureTimeout {
        /// Locator of the target being captured.
        target: String,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// The capture backend ran but failed.
    #[error("capture of {target} failed: {reason}")]
    CaptureFailed {
        /// Locator of the target being captured.
        target: String,
        /// Backend-provided failure description.
        reason: String,
    },

    /// A session is already open for this target.
    #[error("a capture session is already active for {0}")]
    SessionAlreadyActive(String),

    /// The adapter cannot perform the requested event.
    #[error("{adapter} adapter does not support event {event:?}")]
    UnsupportedEvent {
        /// Adapter that rejected the event.
        adapter: String,
        /// The event as written by the caller.
        event: String,
    },

    /// The oracle answered, but without a usable structured block.
    #[error("oracle response malformed: {0}")]
    OracleResponseMalformed(String),

    /// The oracle could not be reached, timed out, or reported an error.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// No baseline exists under this name.
    #[error("baseline {0:?} not found")]
    BaselineNotFound(String),

    /// The baseline manifest exists but cannot be read.
    #[error("baseline manifest at {path} is corrupt: {reason}")]
    ManifestCorrupt {
        /// Manifest location.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// No capture with this id exists in the store.
    #[error("capture {0:?} not found")]
    CaptureNotFound(String),

    /// A checklist item id does not exist in the document.
    #[error("checklist item {0} not found")]
    ItemNotFound(usize),

    /// A task document could not be read.
    #[error("task file {path} could not be read: {reason}")]
    TaskNotFound {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O message.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl Error {
    /// Whether the caller layer may retry the failed operation once.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CaptureTimeout { .. } | Self::CaptureFailed { .. })
    }

    /// Wrap a boxed port error as a storage failure.
    pub(crate) fn io(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Io(format!("{context}: {err}"))
    }
}
