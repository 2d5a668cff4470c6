//! Capture adapter implementations over the context's ports.

pub mod browser;
pub mod cli;
pub mod gui;
pub mod headless;
pub mod tui;

use std::time::Duration;

use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

use super::{AdapterKind, CaptureAdapter, CaptureEvent, CaptureOptions, Session, SessionHandle};

pub use browser::BrowserAdapter;
pub use cli::CliAdapter;
pub use gui::GuiAdapter;
pub use headless::HeadlessAdapter;
pub use tui::TuiAdapter;

/// Budget for releasing a backend resource.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Instantiate the adapter for `kind`.
#[must_use]
pub fn build(kind: AdapterKind, ctx: &ServiceContext) -> Box<dyn CaptureAdapter + '_> {
    match kind {
        AdapterKind::Browser => Box::new(BrowserAdapter::new(ctx)),
        AdapterKind::Headless => Box::new(HeadlessAdapter::new(ctx)),
        AdapterKind::Tui => Box::new(TuiAdapter::new(ctx)),
        AdapterKind::Gui => Box::new(GuiAdapter::new(ctx)),
        AdapterKind::Cli => Box::new(CliAdapter::new(ctx)),
    }
}

fn unsupported(kind: AdapterKind, event: &CaptureEvent) -> Error {
    Error::UnsupportedEvent { adapter: kind.to_string(), event: event.to_string() }
}

/// An explicit wait extends the budget of the call it belongs to.
fn event_budget(options: &CaptureOptions, event: &CaptureEvent) -> Duration {
    match event {
        CaptureEvent::Wait(d) => options.timeout + *d,
        _ => options.timeout,
    }
}

fn stateless_session(ctx: &ServiceContext, target: &TargetSpec) -> Result<Session> {
    let lease = ctx.sessions.acquire(target)?;
    Ok(Session::new(target.clone(), SessionHandle::Stateless, lease))
}

/// Keep the primary outcome; a cleanup failure only surfaces on success.
fn prefer_primary<T>(primary: Result<T>, cleanup: Result<()>) -> Result<T> {
    match (primary, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "cleanup after failed capture also failed");
            Err(err)
        }
    }
}

fn wrong_handle(session: &Session) -> Error {
    Error::CaptureFailed {
        target: session.target().locator.clone(),
        reason: format!("session {} was not opened by this adapter", session.id()),
    }
}
