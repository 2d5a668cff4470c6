//! `glimpse pending` command.

use crate::context::ServiceContext;
use crate::engine::Engine;
use crate::store::CaptureRecord;

/// Execute the `pending` command, optionally narrowed to one tag and/or
/// source.
///
/// # Errors
///
/// Returns an error string if the capture index cannot be read.
pub fn run(ctx: &ServiceContext, tag: Option<&str>, source: Option<&str>) -> Result<(), String> {
    let store = Engine::new(ctx).store();
    let records = match (tag, source) {
        (Some(tag), _) => store.list_by_tag(tag),
        (None, Some(source)) => store.list_by_source(source),
        (None, None) => store.list(),
    }
    .map_err(|e| e.to_string())?;
    let pending: Vec<CaptureRecord> = records
        .into_iter()
        .filter(|r| r.is_pending() && source.map_or(true, |s| r.source == s))
        .collect();
    print!("{}", render(&pending));
    Ok(())
}

/// One line per pending capture, oldest first.
#[must_use]
pub fn render(records: &[CaptureRecord]) -> String {
    if records.is_empty() {
        return "No pending captures.\n".to_string();
    }
    let mut out: String = records
        .iter()
        .map(|r| {
            format!(
                "{}  {}  {}  {}  {}{}\n",
                r.id,
                r.captured_at.format("%Y-%m-%d %H:%M:%S"),
                r.target_kind,
                r.event,
                r.locator,
                if r.tags.is_empty() { String::new() } else { format!("  [{}]", r.tags.join(", ")) }
            )
        })
        .collect();
    out.push_str(&format!("\n{} pending capture(s).\n", records.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOptions;
    use crate::checklist::{TargetKind, TargetSpec};
    use crate::testing::{test_config, test_context};

    #[test]
    fn empty_store_has_nothing_pending() {
        assert_eq!(render(&[]), "No pending captures.\n");
    }

    #[tokio::test]
    async fn lists_stored_captures() {
        let ctx = test_context();
        let engine = Engine::new(&ctx);
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        let options = CaptureOptions::from_config(&test_config());
        let shots = engine.capture(&target, None, &[], &options).await.unwrap();
        engine.store().persist(&shots[0]).unwrap();

        let out = render(&engine.store().list_pending().unwrap());
        assert!(out.starts_with("cap-0001  2024-05-01 12:00:00  webapp  screenshot  http://localhost:3000\n"));
        assert!(out.ends_with("1 pending capture(s).\n"));
    }

    #[test]
    fn filters_by_tag_and_source() {
        let ctx = test_context();
        ctx.fs.write(std::path::Path::new("/shots/run.txt"), "ok\n").unwrap();
        let store = Engine::new(&ctx).store();
        let tags = vec!["smoke".to_string()];
        let record = store.accept(std::path::Path::new("/shots/run.txt"), "accepted", &tags).unwrap();

        assert!(run(&ctx, Some("smoke"), Some("external")).is_ok());
        let out = render(&store.list_by_tag("smoke").unwrap());
        assert!(out.starts_with(&format!("{}  ", record.id)));
        assert!(out.contains("  [smoke]\n"));
        assert!(run(&ctx, None, Some("glimpse")).is_ok());
    }
}
