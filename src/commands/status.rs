//! `glimpse status` command.

use std::fmt::Write as _;
use std::path::Path;

use crate::checklist::TaskDocument;
use crate::context::ServiceContext;
use crate::engine::Engine;

/// Execute the `status` command.
///
/// Displays a table of task documents showing file, title, progress, status
/// and target. A `.md` path shows that one document; any other path is
/// scanned as a task directory.
///
/// # Errors
///
/// Returns an error string if a task file cannot be read or the directory
/// cannot be listed.
pub fn run(ctx: &ServiceContext, path: Option<&Path>) -> Result<(), String> {
    let engine = Engine::new(ctx);
    let paths = match path {
        Some(p) if p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md")) => {
            vec![p.to_path_buf()]
        }
        Some(dir) => crate::checklist::discover(ctx.fs.as_ref(), dir).map_err(|e| e.to_string())?,
        None => engine.discover_tasks().map_err(|e| e.to_string())?,
    };
    if paths.is_empty() {
        println!("No task documents found.");
        return Ok(());
    }

    let docs = paths
        .iter()
        .map(|p| engine.load_task(p))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    print!("{}", render(&docs));
    Ok(())
}

/// Render the status table.
#[must_use]
pub fn render(docs: &[TaskDocument]) -> String {
    let rows: Vec<[String; 5]> = docs
        .iter()
        .map(|doc| {
            let file = doc
                .path()
                .file_name()
                .map_or_else(|| doc.path().display().to_string(), |n| n.to_string_lossy().into_owned());
            let target = doc.target.as_ref().map_or_else(|| "-".to_string(), ToString::to_string);
            [
                file,
                doc.title.clone(),
                format!("{}/{}", doc.completed_count(), doc.items.len()),
                doc.status().to_string(),
                target,
            ]
        })
        .collect();

    let headers = ["FILE", "TITLE", "DONE", "STATUS", "TARGET"];
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| rows.iter().map(|r| r[i].len()).chain([headers[i].len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let line = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let _ = writeln!(out, "{}", line(headers));
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(
        out,
        "{}",
        line([&dashes[0], &dashes[1], &dashes[2], &dashes[3], &dashes[4]])
    );
    for row in &rows {
        let _ = writeln!(out, "{}", line([&row[0], &row[1], &row[2], &row[3], &row[4]]));
    }
    let _ = writeln!(out, "\n{} task(s) total.", rows.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_progress_and_target() {
        let docs = [
            TaskDocument::parse(
                "/p/.claude/login.md",
                "# Login\n[webapp]: http://localhost:3000\n- [x] Form\n- [ ] Errors\n",
            ),
            TaskDocument::parse("/p/.claude/notes.md", "- [ ] Something\n"),
        ];
        let out = render(&docs);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("FILE"));
        assert!(lines[2].contains("login.md"));
        assert!(lines[2].contains("1/2"));
        assert!(lines[2].contains("IN_PROGRESS"));
        assert!(lines[2].contains("webapp: http://localhost:3000"));
        assert!(lines[3].contains("notes"));
        assert!(lines[3].contains("NOT_STARTED"));
        assert!(out.ends_with("2 task(s) total.\n"));
    }

    #[test]
    fn status_of_missing_directory_is_empty() {
        let ctx = crate::testing::test_context();
        assert!(run(&ctx, Some(Path::new("/nowhere"))).is_ok());
    }
}
