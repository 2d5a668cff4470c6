//! Desktop window capture.

use std::path::Path;

use crate::capture::session::bounded;
use crate::capture::{
    AdapterKind, Capture, CaptureAdapter, CaptureEvent, CaptureFuture, CaptureOptions,
    CapturePayload, Session,
};
use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::Result;

use super::{stateless_session, unsupported};

/// Captures a desktop window by title without raising or focusing it.
pub struct GuiAdapter<'a> {
    ctx: &'a ServiceContext,
}

/// Window title to search for: the explicit title, or the executable's stem.
#[must_use]
pub fn window_title(target: &TargetSpec) -> String {
    if let Some(title) = target.window_title.as_deref().filter(|t| !t.trim().is_empty()) {
        return title.trim().to_string();
    }
    let program = target.locator.split_whitespace().next().unwrap_or_default();
    Path::new(program)
        .file_stem()
        .map_or_else(|| program.to_string(), |stem| stem.to_string_lossy().into_owned())
}

impl<'a> GuiAdapter<'a> {
    /// Create an adapter over `ctx.window`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn grab(
        &self,
        target: &TargetSpec,
        delay: std::time::Duration,
        event: &CaptureEvent,
        options: &CaptureOptions,
    ) -> Result<Capture> {
        let title = window_title(target);
        let bytes = bounded(options.timeout + delay, &target.locator, async {
            tokio::time::sleep(delay).await;
            self.ctx.window.capture(&title).await
        })
        .await?;
        Ok(Capture::new(self.ctx, CapturePayload::Image(bytes), target, event.to_string()))
    }
}

impl CaptureAdapter for GuiAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Gui
    }

    fn capture<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture> {
        Box::pin(self.grab(target, options.wait_before, &CaptureEvent::Screenshot, options))
    }

    fn start_session<'a>(
        &'a self,
        target: &'a TargetSpec,
        _options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Session> {
        let session = stateless_session(self.ctx, target);
        Box::pin(async move { session })
    }

    fn capture_on_event<'a>(
        &'a self,
        session: &'a Session,
        event: &'a CaptureEvent,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture> {
        let delay = match event {
            CaptureEvent::Wait(d) => *d,
            CaptureEvent::Screenshot => std::time::Duration::ZERO,
            _ => {
                let err = unsupported(self.kind(), event);
                return Box::pin(async move { Err(err) });
            }
        };
        Box::pin(self.grab(session.target(), delay, event, options))
    }

    fn end_session(&self, session: Session) -> CaptureFuture<'_, ()> {
        drop(session);
        Box::pin(async { Ok(()) })
    }
}
