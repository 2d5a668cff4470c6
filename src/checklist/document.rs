//! Task document parsing, mutation and persistence.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::item::{match_line, ChecklistItem};
use super::target::TargetSpec;
use crate::error::{Error, Result};
use crate::ports::FileSystem;

/// Aggregate completion state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The document has no checklist items.
    NoItems,
    /// Items exist and none is ticked.
    NotStarted,
    /// Some but not all items are ticked.
    InProgress,
    /// Every item is ticked.
    Complete,
}

impl TaskStatus {
    /// Status for `completed` of `total` items.
    #[must_use]
    pub fn from_counts(completed: usize, total: usize) -> Self {
        if total == 0 {
            Self::NoItems
        } else if completed == 0 {
            Self::NotStarted
        } else if completed >= total {
            Self::Complete
        } else {
            Self::InProgress
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoItems => "NO_ITEMS",
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
        })
    }
}

/// A parsed task document.
///
/// The original text is retained; [`TaskDocument::render`] returns it, so a
/// document that was not mutated serializes byte-identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDocument {
    path: PathBuf,
    source: String,
    /// Text of the first `# ` heading, or the file stem.
    pub title: String,
    /// First paragraph after the title.
    pub description: String,
    /// Entries of the "Acceptance Criteria" section.
    pub acceptance_criteria: Vec<String>,
    /// Checklist items in document order.
    pub items: Vec<ChecklistItem>,
    /// Target derived from markers or content.
    pub target: Option<TargetSpec>,
}

impl TaskDocument {
    /// Parse `text` as the document stored at `path`.
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let path = path.into();
        let mut items = Vec::new();
        let mut offset = 0;
        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let line = raw.trim_end_matches(['\n', '\r']);
            if let Some(m) = match_line(line) {
                items.push(ChecklistItem {
                    id: items.len() + 1,
                    text: m.text,
                    completed: m.completed,
                    line: index,
                    mark_offset: offset + m.mark_col,
                    kind: m.kind,
                });
            }
            offset += raw.len();
        }

        let title = text
            .lines()
            .find_map(|l| l.strip_prefix("# ").map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
            });

        Self {
            description: description(text),
            acceptance_criteria: acceptance_criteria(text),
            target: TargetSpec::from_document(text),
            title,
            items,
            source: text.to_string(),
            path,
        }
    }

    /// Location the document was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the document.
    #[must_use]
    pub fn render(&self) -> &str {
        &self.source
    }

    /// Look up an item by id.
    #[must_use]
    pub fn item(&self, id: usize) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Number of ticked items.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }

    /// Aggregate completion state.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_counts(self.completed_count(), self.items.len())
    }

    /// Fraction of ticked items, or `None` without items.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> Option<f64> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.completed_count() as f64 / self.items.len() as f64)
        }
    }

    /// Items that are not yet ticked.
    pub fn open_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|i| !i.completed)
    }

    /// Return a copy with item `id` ticked.
    ///
    /// Exactly one byte of the rendered text changes; ticking an already
    /// ticked item returns an identical document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item has this id.
    pub fn mark_complete(&self, id: usize) -> Result<Self> {
        let item = self.item(id).ok_or(Error::ItemNotFound(id))?;
        let mut next = self.clone();
        if item.completed {
            return Ok(next);
        }
        next.source.replace_range(item.mark_offset..=item.mark_offset, "x");
        if let Some(marked) = next.items.iter_mut().find(|i| i.id == id) {
            marked.completed = true;
        }
        Ok(next)
    }
}

fn is_structural(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('#') || trimmed.starts_with('|') || match_line(line).is_some()
}

fn description(text: &str) -> String {
    let mut lines = text.lines().skip_while(|l| !l.starts_with("# "));
    if lines.next().is_none() {
        return String::new();
    }
    let mut parts = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if parts.is_empty() {
                continue;
            }
            break;
        }
        if is_structural(line) || trimmed.starts_with('[') {
            break;
        }
        parts.push(trimmed);
    }
    parts.join(" ")
}

fn acceptance_criteria(text: &str) -> Vec<String> {
    let mut in_section = false;
    let mut criteria = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            in_section = trimmed.trim_start_matches('#').trim().to_lowercase().starts_with("acceptance");
            continue;
        }
        if !in_section || trimmed.is_empty() {
            continue;
        }
        let entry = match match_line(line) {
            Some(m) => m.text,
            None => trimmed
                .trim_start_matches(['-', '*'])
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches('.')
                .trim()
                .to_string(),
        };
        if !entry.is_empty() {
            criteria.push(entry);
        }
    }
    criteria
}

/// Read and parse a task document fresh from disk.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if the file cannot be read.
pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<TaskDocument> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| Error::TaskNotFound { path: path.to_path_buf(), reason: e.to_string() })?;
    Ok(TaskDocument::parse(path, &text))
}

/// Write the whole document through a temporary sibling and rename it over
/// the original.
///
/// # Errors
///
/// Returns [`Error::Io`] if either step fails; the original is untouched
/// when the temporary write fails.
pub fn save(fs: &dyn FileSystem, doc: &TaskDocument) -> Result<()> {
    let name = doc.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = doc.path.with_file_name(format!(".{name}.tmp"));
    fs.write(&tmp, doc.render()).map_err(|e| Error::io(tmp.display(), e))?;
    fs.rename(&tmp, &doc.path).map_err(|e| Error::io(doc.path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{ItemKind, TargetKind};
    use crate::testing::MemFs;

    const LOGIN: &str = "# Login page\n\
        Build the login form for the dashboard.\n\
        Users sign in with email.\n\
        \n\
        [webapp]: http://localhost:3000/login\n\
        \n\
        ## Acceptance Criteria\n\
        - Email and password fields are visible\n\
        - Errors render inline\n\
        \n\
        ## Checklist\n\
        - [ ] Form renders\n\
        - [x] Validation wired\n\
        * [ ] Error banner shows\n\
        \n\
        | Step | Done |\n\
        |------|------|\n\
        | Submit redirects | [ ] |\n";

    #[test]
    fn parses_all_sections() {
        let doc = TaskDocument::parse(".claude/login.md", LOGIN);
        assert_eq!(doc.title, "Login page");
        assert_eq!(doc.description, "Build the login form for the dashboard. Users sign in with email.");
        assert_eq!(
            doc.acceptance_criteria,
            vec!["Email and password fields are visible", "Errors render inline"]
        );
        assert_eq!(doc.target.as_ref().map(|t| t.kind), Some(TargetKind::Webapp));

        let texts: Vec<&str> = doc.items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Form renders", "Validation wired", "Error banner shows", "Submit redirects"]);
        let ids: Vec<usize> = doc.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(doc.items[2].kind, ItemKind::BulletStar);
        assert_eq!(doc.items[3].kind, ItemKind::TableRow);
    }

    #[test]
    fn render_is_byte_identical() {
        for text in [
            LOGIN,
            "# CRLF\r\n- [ ] one\r\n- [x] two\r\n",
            "- [ ] no trailing newline",
            "",
            "just prose\n\n\n   \n",
            "|a|[ ]|\n|b|[x]|",
        ] {
            assert_eq!(TaskDocument::parse("t.md", text).render(), text);
        }
    }

    #[test]
    fn mark_complete_changes_exactly_one_byte() {
        let text = "# CRLF\r\n- [ ] one\r\n| row | [ ] |\r\n";
        let doc = TaskDocument::parse("t.md", text);
        let marked = doc.mark_complete(2).unwrap();
        let before = doc.render().as_bytes();
        let after = marked.render().as_bytes();
        assert_eq!(before.len(), after.len());
        let diffs: Vec<usize> = (0..before.len()).filter(|&i| before[i] != after[i]).collect();
        assert_eq!(diffs.len(), 1);
        assert_eq!(after[diffs[0]], b'x');
        assert!(marked.item(2).unwrap().completed);
        assert!(!marked.item(1).unwrap().completed);
        assert_eq!(TaskDocument::parse("t.md", marked.render()).items, marked.items);
    }

    #[test]
    fn mark_complete_is_idempotent_and_checks_ids() {
        let doc = TaskDocument::parse("t.md", "- [x] done\n");
        assert_eq!(doc.mark_complete(1).unwrap(), doc);
        assert!(matches!(doc.mark_complete(9), Err(Error::ItemNotFound(9))));
    }

    #[test]
    fn status_and_progress() {
        let doc = TaskDocument::parse("t.md", "- [ ] A\n- [x] B\n- [ ] C\n");
        assert_eq!(doc.status(), TaskStatus::InProgress);
        let progress = doc.progress().unwrap();
        assert!((progress - 1.0 / 3.0).abs() < 1e-9);

        let empty = TaskDocument::parse("t.md", "# Notes\n");
        assert_eq!(empty.status(), TaskStatus::NoItems);
        assert_eq!(empty.status().to_string(), "NO_ITEMS");
        assert_eq!(empty.progress(), None);

        assert_eq!(TaskStatus::from_counts(0, 2), TaskStatus::NotStarted);
        assert_eq!(TaskStatus::from_counts(2, 2), TaskStatus::Complete);
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let doc = TaskDocument::parse(".claude/refactor-store.md", "- [ ] x\n");
        assert_eq!(doc.title, "refactor-store");
        assert!(doc.description.is_empty());
    }

    #[test]
    fn save_replaces_atomically_and_load_reads_fresh() {
        let fs = MemFs::new();
        let path = Path::new("/p/.claude/task.md");
        fs.write(path, "- [ ] A\n").unwrap();

        let doc = load(&fs, path).unwrap();
        save(&fs, &doc.mark_complete(1).unwrap()).unwrap();

        assert_eq!(fs.read_to_string(path).unwrap(), "- [x] A\n");
        assert!(!fs.exists(Path::new("/p/.claude/.task.md.tmp")));
        assert_eq!(load(&fs, path).unwrap().status(), TaskStatus::Complete);
    }

    #[test]
    fn missing_document_is_task_not_found() {
        let fs = MemFs::new();
        let err = load(&fs, Path::new("/nope.md")).unwrap_err();
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }
}
