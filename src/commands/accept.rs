//! `glimpse accept` command.

use std::path::{Path, PathBuf};

use crate::context::ServiceContext;
use crate::engine::Engine;

/// Execute the `accept` command.
///
/// A single file takes `event` (default `accepted`); several files are
/// accepted as a batch and failures are skipped with a warning.
///
/// # Errors
///
/// Returns an error string if a single file cannot be accepted, `event` is
/// given with several files, or no file of a batch was accepted.
pub fn run(
    ctx: &ServiceContext,
    files: &[PathBuf],
    event: Option<&str>,
    tags: &[String],
) -> Result<(), String> {
    let store = Engine::new(ctx).store();
    let records = match files {
        [file] => vec![store
            .accept(file, event.unwrap_or("accepted"), tags)
            .map_err(|e| e.to_string())?],
        _ if event.is_some() => return Err("--event applies to a single file".to_string()),
        _ => {
            let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
            let records = store.accept_batch(&paths, tags);
            if records.is_empty() {
                return Err("no files were accepted".to_string());
            }
            records
        }
    };
    for record in &records {
        println!("{}  {}  {}", record.id, record.event, record.locator);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{test_context, PNG};

    #[test]
    fn accepts_single_and_batch() {
        let ctx = test_context();
        ctx.fs.write_bytes(Path::new("/shots/a.png"), PNG).unwrap();
        ctx.fs.write(Path::new("/shots/b.txt"), "done\n").unwrap();
        let tags = vec!["nightly".to_string()];

        run(&ctx, &[PathBuf::from("/shots/a.png")], Some("after deploy"), &tags).unwrap();
        run(&ctx, &[PathBuf::from("/shots/b.txt"), PathBuf::from("/shots/x.png")], None, &[]).unwrap();

        let store = Engine::new(&ctx).store();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, "after deploy");
        assert_eq!(records[1].event, "batch:1");
        assert_eq!(store.list_by_tag("nightly").unwrap().len(), 1);
    }

    #[test]
    fn event_with_several_files_is_rejected() {
        let ctx = test_context();
        let files = [PathBuf::from("/a.png"), PathBuf::from("/b.png")];
        assert!(run(&ctx, &files, Some("x"), &[]).unwrap_err().contains("single file"));
        assert_eq!(run(&ctx, &files, None, &[]).unwrap_err(), "no files were accepted");
    }

    #[test]
    fn missing_single_file_is_an_error() {
        let ctx = test_context();
        assert!(run(&ctx, &[PathBuf::from("/nope.png")], None, &[]).is_err());
    }
}
