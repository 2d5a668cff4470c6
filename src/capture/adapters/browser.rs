//! Browser adapter driving a WebDriver session.

use crate::capture::session::bounded;
use crate::capture::{
    AdapterKind, Capture, CaptureAdapter, CaptureEvent, CaptureFuture, CaptureOptions,
    CapturePayload, Session, SessionHandle,
};
use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::ports::DriverAction;

use super::{event_budget, prefer_primary, unsupported, wrong_handle, CLOSE_TIMEOUT};

/// Captures web pages through the automation driver. Supports every event.
pub struct BrowserAdapter<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BrowserAdapter<'a> {
    /// Create an adapter over `ctx.driver`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn open(&self, target: &TargetSpec, options: &CaptureOptions) -> Result<Session> {
        let lease = self.ctx.sessions.acquire(target)?;
        let driver_session = bounded(
            options.timeout,
            &target.locator,
            self.ctx.driver.open(&target.locator, options.width, options.height),
        )
        .await?;
        Ok(Session::new(target.clone(), SessionHandle::Driver(driver_session), lease))
    }

    async fn close(&self, session: Session) -> Result<()> {
        let SessionHandle::Driver(id) = session.handle() else {
            return Err(wrong_handle(&session));
        };
        bounded(CLOSE_TIMEOUT, &session.target().locator, self.ctx.driver.close(id)).await
    }

    fn action(session: &Session, event: &CaptureEvent) -> Result<Option<DriverAction>> {
        Ok(match event {
            CaptureEvent::Screenshot | CaptureEvent::Wait(_) => None,
            CaptureEvent::Navigate(url) => Some(DriverAction::Navigate(
                url.clone().unwrap_or_else(|| session.target().locator.clone()),
            )),
            CaptureEvent::Click(selector) => Some(DriverAction::Click(selector.clone())),
            CaptureEvent::Input(arg) => {
                let (selector, value) = CaptureEvent::input_assignment(arg).ok_or_else(|| {
                    Error::Parse(format!("browser input needs selector=value, got {arg:?}"))
                })?;
                Some(DriverAction::Input { selector: selector.to_string(), value: value.to_string() })
            }
            CaptureEvent::Hover(selector) => Some(DriverAction::Hover(selector.clone())),
            CaptureEvent::Scroll(selector) => Some(DriverAction::Scroll(selector.clone())),
        })
    }

    async fn on_event(
        &self,
        session: &Session,
        event: &CaptureEvent,
        options: &CaptureOptions,
    ) -> Result<Capture> {
        let SessionHandle::Driver(id) = session.handle() else {
            return Err(wrong_handle(session));
        };
        let target = session.target();
        let action = Self::action(session, event)?;
        let bytes = bounded(event_budget(options, event), &target.locator, async {
            match (&action, event) {
                (Some(action), _) => {
                    self.ctx.driver.perform(id, action).await?;
                    tokio::time::sleep(options.settle).await;
                }
                (None, CaptureEvent::Wait(d)) => tokio::time::sleep(*d).await,
                (None, _) => tokio::time::sleep(options.settle).await,
            }
            self.ctx.driver.screenshot(id).await
        })
        .await?;
        Ok(Capture::new(self.ctx, CapturePayload::Image(bytes), target, event.to_string()))
    }

    async fn single(&self, target: &TargetSpec, options: &CaptureOptions) -> Result<Capture> {
        let session = self.open(target, options).await?;
        let shot = match session.handle() {
            SessionHandle::Driver(id) => {
                bounded(options.timeout + options.wait_before, &target.locator, async {
                    tokio::time::sleep(options.wait_before).await;
                    self.ctx.driver.screenshot(id).await
                })
                .await
            }
            _ => Err(wrong_handle(&session)),
        };
        let closed = self.close(session).await;
        let bytes = prefer_primary(shot, closed)?;
        Ok(Capture::new(self.ctx, CapturePayload::Image(bytes), target, "screenshot"))
    }
}

impl CaptureAdapter for BrowserAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Browser
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
    use crate::capture::run_sequence;
    use crate::checklist::TargetKind;
    use crate::testing::{test_context, FakeDriver};

    #[tokio::test]
    async fn sequence_performs_actions_and_closes_session() {
        let driver = FakeDriver::default();
        let mut ctx = test_context();
        ctx.driver = Box::new(driver.clone());
        let adapter = BrowserAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        let events: Vec<CaptureEvent> = ["click:#login", "input:#email=a@b.c", "navigate", "screenshot"]
            .iter()
            .map(|e| e.parse().unwrap())
            .collect();

        let captures = run_sequence(&adapter, &target, &events, &crate::capture::CaptureOptions {
            settle: std::time::Duration::ZERO,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(captures.len(), 4);
        assert_eq!(captures[1].event(), "input:#email=a@b.c");
        assert_eq!(captures[0].mime(), "image/png");
        let log = driver.log();
        assert_eq!(log[0], "open http://localhost:3000");
        assert!(log.contains(&"click #login".to_string()));
        assert!(log.contains(&"input #email=a@b.c".to_string()));
        assert!(log.contains(&"navigate http://localhost:3000".to_string()));
        assert_eq!(log.last().unwrap(), "close s1");
        assert!(!ctx.sessions.is_active(&target));
    }

    #[tokio::test]
    async fn failed_event_still_closes_session() {
        let driver = FakeDriver::default();
        let mut ctx = test_context();
        ctx.driver = Box::new(driver.clone());
        let adapter = BrowserAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        let events = vec![CaptureEvent::Click("#missing".into()), CaptureEvent::Screenshot];

        let err = run_sequence(&adapter, &target, &events, &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CaptureFailed { .. }));
        assert_eq!(driver.log().last().unwrap(), "close s1");
        assert!(!ctx.sessions.is_active(&target));
    }

    #[tokio::test]
    async fn input_without_selector_is_a_parse_error() {
        let mut ctx = test_context();
        ctx.driver = Box::new(FakeDriver::default());
        let adapter = BrowserAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        let err = run_sequence(&adapter, &target, &[CaptureEvent::Input("hello".into())], &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
