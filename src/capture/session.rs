//! Scoped capture sessions.
//!
//! A [`Session`] holds a [`SessionLease`] from the context's
//! [`SessionRegistry`]; the lease is released when the session is dropped,
//! so a target can never be left marked busy. [`run_sequence`] always ends
//! the session it started, on success and on every error path.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::checklist::TargetSpec;
use crate::error::{Error, Result};

use super::event::CaptureEvent;
use super::{Capture, CaptureAdapter, CaptureOptions};

/// Tracks which targets have an open session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<String>>>,
    issued: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `target` for one session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyActive`] if a lease for the same target
    /// is still held.
    pub fn acquire(&self, target: &TargetSpec) -> Result<SessionLease> {
        let key = session_key(target);
        let mut active = self.active.lock().map_err(|_| Error::Io("session registry poisoned".into()))?;
        if !active.insert(key.clone()) {
            return Err(Error::SessionAlreadyActive(target.locator.clone()));
        }
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SessionLease { id: format!("session-{n}"), key, active: Arc::clone(&self.active) })
    }

    /// Whether `target` currently has an open session.
    #[must_use]
    pub fn is_active(&self, target: &TargetSpec) -> bool {
        self.active.lock().is_ok_and(|a| a.contains(&session_key(target)))
    }

    /// Number of open sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.lock().map_or(0, |a| a.len())
    }
}

fn session_key(target: &TargetSpec) -> String {
    format!("{}:{}", target.kind, target.locator)
}

/// Registry reservation released on drop.
#[derive(Debug)]
pub struct SessionLease {
    id: String,
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.key);
        }
    }
}

/// Backend resource owned by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionHandle {
    /// Nothing to keep open between captures.
    Stateless,
    /// Automation driver session id.
    Driver(String),
    /// Terminal host handle.
    Terminal(String),
}

/// An open capture session on one target.
#[derive(Debug)]
pub struct Session {
    target: TargetSpec,
    handle: SessionHandle,
    lease: SessionLease,
}

impl Session {
    pub(crate) fn new(target: TargetSpec, handle: SessionHandle, lease: SessionLease) -> Self {
        Self { target, handle, lease }
    }

    /// Registry-issued identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.lease.id
    }

    /// Target the session was opened on.
    #[must_use]
    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    /// Backend resource.
    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }
}

/// Run `fut` with a time budget, mapping expiry to [`Error::CaptureTimeout`].
///
/// On expiry the future is dropped before the error is returned.
///
/// # Errors
///
/// Returns the future's own error, or `CaptureTimeout` on expiry.
pub async fn bounded<T>(
    limit: Duration,
    target: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::CaptureTimeout { target: target.to_string(), after: limit }),
    }
}

/// Open a session, capture once per event, and end the session.
///
/// The sequence is validated against the adapter's support matrix before
/// anything is opened and aborts on the first failing event. The session is
/// ended on every path; an error while ending is logged and only returned
/// when the events themselves succeeded.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEvent`], the first event's failure, or the
/// failure to start or end the session.
pub async fn run_sequence(
    adapter: &dyn CaptureAdapter,
    target: &TargetSpec,
    events: &[CaptureEvent],
    options: &CaptureOptions,
) -> Result<Vec<Capture>> {
    let kind = adapter.kind();
    if let Some(event) = events.iter().find(|e| !kind.supports(e)) {
        return Err(Error::UnsupportedEvent { adapter: kind.to_string(), event: event.to_string() });
    }

    let session = adapter.start_session(target, options).await?;
    let session_id = session.id().to_string();
    tracing::info!(session = %session_id, adapter = %kind, target = %target, "capture session started");

    let mut captures = Vec::with_capacity(events.len());
    let mut outcome = Ok(());
    for event in events {
        match adapter.capture_on_event(&session, event, options).await {
            Ok(capture) => captures.push(capture),
            Err(err) => {
                tracing::warn!(session = %session_id, %event, error = %err, "capture event failed");
                outcome = Err(err);
                break;
            }
        }
    }

    let ended = adapter.end_session(session).await;
    tracing::info!(session = %session_id, captures = captures.len(), "capture session ended");
    match (outcome, ended) {
        (Ok(()), Ok(())) => Ok(captures),
        (Ok(()), Err(end)) => Err(end),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(end)) => {
            tracing::warn!(session = %session_id, error = %end, "failed to end session cleanly");
            Err(err)
        }
    }
}
