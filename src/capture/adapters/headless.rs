//! One-shot headless screenshots for webapps.

use crate::capture::session::bounded;
use crate::capture::{
    AdapterKind, Capture, CaptureAdapter, CaptureEvent, CaptureFuture, CaptureOptions,
    CapturePayload, Session,
};
use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::Result;

use super::{event_budget, stateless_session, unsupported};

/// Screenshots a URL with a headless browser process. Keeps no page state,
/// so only `screenshot` and `wait` events are supported.
pub struct HeadlessAdapter<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> HeadlessAdapter<'a> {
    /// Create an adapter over `ctx.headless`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn shoot(
        &self,
        target: &TargetSpec,
        event: &CaptureEvent,
        options: &CaptureOptions,
    ) -> Result<Capture> {
        let bytes = bounded(event_budget(options, event), &target.locator, async {
            if let CaptureEvent::Wait(d) = event {
                tokio::time::sleep(*d).await;
            }
            self.ctx.headless.screenshot(&target.locator, options.width, options.height).await
        })
        .await?;
        Ok(Capture::new(self.ctx, CapturePayload::Image(bytes), target, event.to_string()))
    }
}

impl CaptureAdapter for HeadlessAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Headless
    }

    fn capture<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture> {
        Box::pin(self.shoot(target, &CaptureEvent::Screenshot, options))
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
        if !self.kind().supports(event) {
            let err = unsupported(self.kind(), event);
            return Box::pin(async move { Err(err) });
        }
        Box::pin(self.shoot(session.target(), event, options))
    }

    fn end_session(&self, session: Session) -> CaptureFuture<'_, ()> {
        drop(session);
        Box::pin(async { Ok(()) })
    }
}
