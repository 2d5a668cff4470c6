//! Terminal UI capture through a hosted terminal.

use crate::capture::session::bounded;
use crate::capture::{
    AdapterKind, Capture, CaptureAdapter, CaptureEvent, CaptureFuture, CaptureOptions,
    CapturePayload, Session, SessionHandle,
};
use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::Result;

use super::{event_budget, prefer_primary, unsupported, wrong_handle, CLOSE_TIMEOUT};

/// Runs the target command in a hosted terminal and captures its screen as
/// text. Keystrokes are delivered through `input` events.
pub struct TuiAdapter<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TuiAdapter<'a> {
    /// Create an adapter over `ctx.terminal`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn open(&self, target: &TargetSpec, options: &CaptureOptions) -> Result<Session> {
        let lease = self.ctx.sessions.acquire(target)?;
        let handle = bounded(options.timeout, &target.locator, self.ctx.terminal.spawn(&target.locator))
            .await?;
        let session = Session::new(target.clone(), SessionHandle::Terminal(handle), lease);
        // First frame.
        tokio::time::sleep(options.wait_before).await;
        Ok(session)
    }

    async fn close(&self, session: Session) -> Result<()> {
        let SessionHandle::Terminal(handle) = session.handle() else {
            return Err(wrong_handle(&session));
        };
        bounded(CLOSE_TIMEOUT, &session.target().locator, self.ctx.terminal.close(handle)).await
    }

    async fn on_event(
        &self,
        session: &Session,
        event: &CaptureEvent,
        options: &CaptureOptions,
    ) -> Result<Capture> {
        let SessionHandle::Terminal(handle) = session.handle() else {
            return Err(wrong_handle(session));
        };
        let target = session.target();
        let screen = bounded(event_budget(options, event), &target.locator, async {
            match event {
                CaptureEvent::Input(arg) => {
                    let keys = CaptureEvent::keystrokes(arg);
                    self.ctx.terminal.send_input(handle, &keys).await?;
                    tokio::time::sleep(options.settle).await;
                }
                CaptureEvent::Wait(d) => tokio::time::sleep(*d).await,
                _ => tokio::time::sleep(options.settle).await,
            }
            self.ctx.terminal.snapshot(handle).await
        })
        .await?;
        Ok(Capture::new(self.ctx, CapturePayload::Text(screen), target, event.to_string()))
    }

    async fn single(&self, target: &TargetSpec, options: &CaptureOptions) -> Result<Capture> {
        let session = self.open(target, options).await?;
        let shot = self.on_event(&session, &CaptureEvent::Screenshot, options).await;
        let closed = self.close(session).await;
        prefer_primary(shot, closed)
    }
}

impl CaptureAdapter for TuiAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Tui
    }

    fn capture<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture> {
        Box::pin(self.single(target, options))
    }

    fn start_session<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Session> {
        Box::pin(self.open(target, options))
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
        Box::pin(self.on_event(session, event, options))
    }

    fn end_session(&self, session: Session) -> CaptureFuture<'_, ()> {
        Box::pin(self.close(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::terminal::PipedTerminalHost;
    use crate::capture::run_sequence;
    use crate::checklist::TargetKind;
    use crate::testing::test_context;
    use std::time::Duration;

    fn fast() -> CaptureOptions {
        CaptureOptions {
            timeout: Duration::from_secs(5),
            wait_before: Duration::from_millis(50),
            settle: Duration::from_millis(200),
            ..CaptureOptions::default()
        }
    }

    #[tokio::test]
    async fn typed_input_shows_up_on_screen() {
        let mut ctx = test_context();
        ctx.terminal = Box::new(PipedTerminalHost::new());
        let adapter = TuiAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Tui, "cat");
        let events = vec!["input:hello\\n".parse().unwrap()];

        let captures = run_sequence(&adapter, &target, &events, &fast()).await.unwrap();

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].mime(), "text/plain");
        match captures[0].payload() {
            CapturePayload::Text(screen) => assert!(screen.contains("hello")),
            CapturePayload::Image(_) => panic!("expected text"),
        }
        assert_eq!(ctx.sessions.active_count(), 0);
    }

    #[tokio::test]
    async fn click_is_not_a_terminal_event() {
        let ctx = test_context();
        let adapter = TuiAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Tui, "top");
        let err = run_sequence(&adapter, &target, &["click:#x".parse().unwrap()], &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::UnsupportedEvent { .. }));
    }
}
