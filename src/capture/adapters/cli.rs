//! Command output capture.

use std::fmt::Write as _;

use crate::capture::session::bounded;
use crate::capture::{
    AdapterKind, Capture, CaptureAdapter, CaptureEvent, CaptureFuture, CaptureOptions,
    CapturePayload, Session,
};
use crate::checklist::TargetSpec;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::ports::ShellOutput;

use super::{event_budget, stateless_session, unsupported};

/// Runs the target command to completion and captures its output as text.
///
/// A non-zero exit status is evidence, not a capture failure.
pub struct CliAdapter<'a> {
    ctx: &'a ServiceContext,
}

/// Render a command run as a transcript.
#[must_use]
pub fn transcript(command: &str, output: &ShellOutput) -> String {
    let mut text = format!("$ {command}\n");
    text.push_str(&output.stdout);
    if !output.stdout.is_empty() && !output.stdout.ends_with('\n') {
        text.push('\n');
    }
    if !output.stderr.trim().is_empty() {
        text.push_str("[stderr]\n");
        text.push_str(&output.stderr);
        if !output.stderr.ends_with('\n') {
            text.push('\n');
        }
    }
    let _ = writeln!(text, "[exit code {}]", output.exit_code);
    text
}

impl<'a> CliAdapter<'a> {
    /// Create an adapter over `ctx.shell`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn execute(
        &self,
        target: &TargetSpec,
        event: &CaptureEvent,
        options: &CaptureOptions,
    ) -> Result<Capture> {
        let command = target.locator.as_str();
        let output = bounded(event_budget(options, event), command, async {
            if let CaptureEvent::Wait(d) = event {
                tokio::time::sleep(*d).await;
            }
            self.ctx
                .shell
                .run(command)
                .await
                .map_err(|e| Error::CaptureFailed { target: command.to_string(), reason: e.to_string() })
        })
        .await?;
        tracing::debug!(command, exit_code = output.exit_code, "command captured");
        let text = transcript(command, &output);
        Ok(Capture::new(self.ctx, CapturePayload::Text(text), target, event.to_string()))
    }
}

impl CaptureAdapter for CliAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cli
    }

    fn capture<'a>(
        &'a self,
        target: &'a TargetSpec,
        options: &'a CaptureOptions,
    ) -> CaptureFuture<'a, Capture> {
        Box::pin(self.execute(target, &CaptureEvent::Screenshot, options))
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
        Box::pin(self.execute(session.target(), event, options))
    }

    fn end_session(&self, session: Session) -> CaptureFuture<'_, ()> {
        drop(session);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::shell::LiveShellExecutor;
    use crate::capture::run_sequence;
    use crate::checklist::TargetKind;
    use crate::testing::test_context;
    use std::time::Duration;

    #[test]
    fn transcript_includes_stderr_and_exit_code() {
        let output = ShellOutput { exit_code: 2, stdout: "ok".into(), stderr: "boom\n".into() };
        assert_eq!(transcript("make", &output), "$ make\nok\n[stderr]\nboom\n[exit code 2]\n");
    }

    #[tokio::test]
    async fn failing_command_is_still_a_capture() {
        let mut ctx = test_context();
        ctx.shell = Box::new(LiveShellExecutor);
        let adapter = CliAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Cli, "echo broken; exit 3");
        let capture = adapter.capture(&target, &CaptureOptions::default()).await.unwrap();
        match capture.payload() {
            CapturePayload::Text(text) => {
                assert!(text.contains("broken"));
                assert!(text.ends_with("[exit code 3]\n"));
            }
            CapturePayload::Image(_) => panic!("expected text"),
        }
    }

    #[tokio::test]
    async fn slow_command_times_out_and_releases_session() {
        let mut ctx = test_context();
        ctx.shell = Box::new(LiveShellExecutor);
        let adapter = CliAdapter::new(&ctx);
        let target = TargetSpec::new(TargetKind::Cli, "sleep 5");
        let options = CaptureOptions::default().with_timeout(Duration::from_millis(100));

        let err = run_sequence(&adapter, &target, &[CaptureEvent::Screenshot], &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CaptureTimeout { .. }));
        assert!(!ctx.sessions.is_active(&target));
    }
}
