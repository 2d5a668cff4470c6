//! Finding task documents in a project.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ports::FileSystem;

const SKIPPED: [&str; 2] = ["readme.md", "changelog.md"];

/// List task documents in `dir`, sorted by file name.
///
/// A task document is a `*.md` file that is not hidden, not a README or
/// CHANGELOG, and contains at least one checkbox. A missing directory
/// yields an empty list.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory exists but cannot be listed.
pub fn discover(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    if !fs.exists(dir) {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for name in fs.list_dir(dir).map_err(|e| Error::io(dir.display(), e))? {
        let lower = name.to_lowercase();
        if name.starts_with('.')
            || !Path::new(&lower).extension().is_some_and(|ext| ext == "md")
            || SKIPPED.contains(&lower.as_str())
        {
            continue;
        }
        let path = dir.join(&name);
        // Unreadable files are not task documents.
        let Ok(text) = fs.read_to_string(&path) else { continue };
        if ["[ ]", "[x]", "[X]"].iter().any(|mark| text.contains(mark)) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    #[test]
    fn lists_only_task_documents() {
        let fs = MemFs::new();
        let dir = Path::new("/p/.claude");
        fs.write(&dir.join("b-login.md"), "- [ ] form\n").unwrap();
        fs.write(&dir.join("a-api.MD"), "- [X] done\n").unwrap();
        fs.write(&dir.join("notes.md"), "no boxes\n").unwrap();
        fs.write(&dir.join("README.md"), "- [ ] ignored\n").unwrap();
        fs.write(&dir.join(".draft.md"), "- [ ] hidden\n").unwrap();
        fs.write(&dir.join("todo.txt"), "- [ ] wrong extension\n").unwrap();

        let found = discover(&fs, dir).unwrap();
        assert_eq!(found, vec![dir.join("a-api.MD"), dir.join("b-login.md")]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let fs = MemFs::new();
        assert!(discover(&fs, Path::new("/none")).unwrap().is_empty());
    }
}
