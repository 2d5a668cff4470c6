//! `glimpse capture` command.

use std::time::Duration;

use crate::capture::{detect, AdapterKind, Capture, CaptureOptions, CapturePayload};
use crate::context::ServiceContext;
use crate::engine::Engine;
use crate::store::SOURCE_ADAPTER;

use super::{block_on, parse_events};

/// Arguments of the `capture` command.
#[derive(Debug)]
pub struct CaptureArgs<'a> {
    /// Target string.
    pub target: &'a str,
    /// Forced adapter.
    pub adapter: Option<AdapterKind>,
    /// Raw `--event` values.
    pub events: &'a [String],
    /// Per-call budget override.
    pub timeout_secs: Option<u64>,
    /// Persist the captures.
    pub store: bool,
    /// Labels for stored captures.
    pub tags: &'a [String],
}

/// Execute the `capture` command.
///
/// Prints one line per capture; stored captures are listed by id so they can
/// be verified or promoted to a baseline later.
///
/// # Errors
///
/// Returns an error string if the target or an event cannot be parsed, or
/// the capture or store fails.
pub fn run(ctx: &ServiceContext, args: &CaptureArgs<'_>) -> Result<(), String> {
    let target = detect(args.target).map_err(|e| e.to_string())?;
    let events = parse_events(args.events)?;
    let mut options = CaptureOptions::from_config(&ctx.config);
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let engine = Engine::new(ctx);
    let captures = block_on(engine.capture(&target, args.adapter, &events, &options))?
        .map_err(|e| e.to_string())?;

    let store = engine.store();
    for capture in &captures {
        if args.store {
            let record =
                store.persist_tagged(capture, SOURCE_ADAPTER, args.tags).map_err(|e| e.to_string())?;
            let file = store.root().join("captures").join(&record.file);
            println!("{}  {}  {}", record.id, record.event, file.display());
        } else {
            print!("{}", describe(capture));
        }
    }
    Ok(())
}

/// Summary of an unstored capture; text payloads are printed in full.
#[must_use]
pub fn describe(capture: &Capture) -> String {
    match capture.payload() {
        CapturePayload::Image(bytes) => {
            format!(
                "{}  {}  image/png, {} bytes (not stored)\n",
                capture.id(),
                capture.event(),
                bytes.len()
            )
        }
        CapturePayload::Text(text) => {
            let mut out = format!("{}  {}\n{text}", capture.id(), capture.event());
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;

    #[test]
    fn stores_cli_capture() {
        let ctx = test_context();
        let result = run(
            &ctx,
            &CaptureArgs {
                target: "cli:echo hello",
                adapter: None,
                events: &[],
                timeout_secs: Some(10),
                store: true,
                tags: &["smoke".to_string()],
            },
        );
        assert!(result.is_ok(), "{result:?}");
        let pending = Engine::new(&ctx).store().list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tags, ["smoke"]);
        assert_eq!(pending[0].mime, "text/plain");
    }

    #[test]
    fn rejects_unknown_event() {
        let ctx = test_context();
        let err = run(
            &ctx,
            &CaptureArgs {
                target: "http://localhost:3000",
                adapter: None,
                events: &["teleport".to_string()],
                timeout_secs: None,
                store: false,
                tags: &[],
            },
        )
        .unwrap_err();
        assert!(err.contains("teleport"));
    }
}
