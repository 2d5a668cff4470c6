//! `glimpse verify` command.

use std::fmt::Write as _;
use std::path::Path;

use crate::capture::{AdapterKind, CaptureOptions};
use crate::context::ServiceContext;
use crate::engine::{Engine, EvidenceSource, VerifyOptions, VerifyOutcome};
use crate::verify::VerdictStatus;

use super::{block_on, parse_events};

/// Arguments of the `verify` command.
#[derive(Debug)]
pub struct VerifyArgs<'a> {
    /// Task document.
    pub task: &'a Path,
    /// Target override.
    pub target: Option<&'a str>,
    /// Forced adapter.
    pub adapter: Option<AdapterKind>,
    /// Raw `--event` values.
    pub events: &'a [String],
    /// Judge stored pending captures.
    pub pending: bool,
    /// Surface per-capture analysis.
    pub detailed: bool,
    /// Leave the task file untouched.
    pub dry_run: bool,
    /// Checklist item the captures are evidence for.
    pub item: Option<usize>,
}

/// Execute the `verify` command.
///
/// # Errors
///
/// Returns an error string if evidence cannot be gathered, the oracle fails
/// or its answer is malformed, or the task file cannot be updated.
pub fn run(ctx: &ServiceContext, args: &VerifyArgs<'_>) -> Result<(), String> {
    let options = VerifyOptions {
        source: evidence_source(args)?,
        capture: CaptureOptions::from_config(&ctx.config),
        detailed: args.detailed,
        dry_run: args.dry_run,
        item: args.item,
    };
    let outcome = block_on(Engine::new(ctx).verify_task(args.task, &options))?
        .map_err(|e| e.to_string())?;
    print!("{}", render(&outcome, args.dry_run));
    Ok(())
}

fn evidence_source(args: &VerifyArgs<'_>) -> Result<EvidenceSource, String> {
    if args.pending {
        return Ok(EvidenceSource::Pending);
    }
    Ok(EvidenceSource::Capture {
        target: args.target.map(str::to_string),
        adapter: args.adapter,
        events: parse_events(args.events)?,
    })
}

fn label(status: VerdictStatus) -> &'static str {
    match status {
        VerdictStatus::Completed => "COMPLETED",
        VerdictStatus::NotCompleted => "NOT_COMPLETED",
        VerdictStatus::Uncertain => "UNCERTAIN",
    }
}

/// Human-readable report of a verification.
#[must_use]
pub fn render(outcome: &VerifyOutcome, dry_run: bool) -> String {
    let result = &outcome.result;
    let mut out = String::new();
    let _ = writeln!(out, "Verification of {}: {}", outcome.document.title, result.summary_line());

    for verdict in &result.verdicts {
        let text = outcome.document.item(verdict.item).map_or("", |i| i.text.as_str());
        let _ = write!(out, "  {:>3}. {:<13} {text}", verdict.item, label(verdict.status));
        if verdict.evidence.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, " ({})", verdict.evidence);
        }
    }

    for detail in &result.details {
        let _ = writeln!(out, "  capture {} [{}]: {:?}", detail.index, detail.capture_id, detail.status);
        if !detail.evidence.is_empty() {
            let _ = writeln!(out, "      {}", detail.evidence);
        }
        for issue in &detail.issues {
            let _ = writeln!(out, "      issue: {issue}");
        }
    }

    for issue in &result.issues {
        let _ = writeln!(out, "Issue: {issue}");
    }
    if !result.recommendation.is_empty() {
        let _ = writeln!(out, "Recommendation: {}", result.recommendation);
    }

    if outcome.flipped.is_empty() {
        out.push_str("No checklist items changed.\n");
    } else {
        let ids: Vec<String> = outcome.flipped.iter().map(ToString::to_string).collect();
        let verb = if dry_run { "Would mark" } else { "Marked" };
        let _ = writeln!(out, "{verb} complete: {}", ids.join(", "));
    }
    if result.all_completed {
        out.push_str("All checklist items are complete.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureEvent;
    use crate::testing::{test_context, ScriptedOracle};

    const TASK: &str = "/project/.claude/login.md";

    #[test]
    fn verifies_and_reports() {
        let mut ctx = test_context();
        ctx.oracle = Box::new(ScriptedOracle::replying([
            r#"{"summary": {"passed": 1}, "recommendation": "ship it",
                "items": [{"id": 1, "status": "completed", "evidence": "form shown"}]}"#,
        ]));
        ctx.fs.write(Path::new(TASK), "# Login\n[webapp]: http://localhost:3000\n- [ ] Form\n").unwrap();
        let args = VerifyArgs {
            task: Path::new(TASK),
            target: None,
            adapter: None,
            events: &[],
            pending: false,
            detailed: false,
            dry_run: true,
            item: None,
        };
        assert!(run(&ctx, &args).is_ok());

        let doc = Engine::new(&ctx).load_task(Path::new(TASK)).unwrap();
        assert!(!doc.item(1).unwrap().completed);
    }

    #[test]
    fn flags_select_the_evidence_source() {
        let events = ["click:#submit".to_string(), "screenshot".to_string()];
        let mut args = VerifyArgs {
            task: Path::new(TASK),
            target: Some("http://localhost:8080"),
            adapter: Some(AdapterKind::Headless),
            events: &events,
            pending: false,
            detailed: false,
            dry_run: false,
            item: None,
        };
        assert_eq!(
            evidence_source(&args).unwrap(),
            EvidenceSource::Capture {
                target: Some("http://localhost:8080".to_string()),
                adapter: Some(AdapterKind::Headless),
                events: vec![CaptureEvent::Click("#submit".into()), CaptureEvent::Screenshot],
            }
        );

        args.pending = true;
        assert_eq!(evidence_source(&args).unwrap(), EvidenceSource::Pending);
    }

    #[test]
    fn missing_task_is_an_error() {
        let ctx = test_context();
        let args = VerifyArgs {
            task: Path::new("/project/.claude/none.md"),
            target: None,
            adapter: None,
            events: &[],
            pending: true,
            detailed: false,
            dry_run: false,
            item: None,
        };
        let err = run(&ctx, &args).unwrap_err();
        assert!(err.contains("none.md"));
    }

    #[test]
    fn item_flag_binds_captures_to_that_item() {
        let mut ctx = test_context();
        ctx.oracle = Box::new(ScriptedOracle::replying([
            r#"{"summary": {"passed": 1}, "details": [{"image_index": 1, "status": "pass", "evidence": "form shown"}]}"#,
        ]));
        ctx.fs
            .write(Path::new(TASK), "# Login\n[webapp]: http://localhost:3000\n- [ ] Form\n- [ ] Error text\n")
            .unwrap();
        let args = VerifyArgs {
            task: Path::new(TASK),
            target: None,
            adapter: None,
            events: &[],
            pending: false,
            detailed: false,
            dry_run: false,
            item: Some(2),
        };
        assert!(run(&ctx, &args).is_ok());

        let doc = Engine::new(&ctx).load_task(Path::new(TASK)).unwrap();
        assert!(!doc.item(1).unwrap().completed);
        assert!(doc.item(2).unwrap().completed);
    }
}
