//! Checklist items and line recognition.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `- [ ] text` and `* [x] text`, capturing bullet, mark and text.
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*([-*])[ \t]+\[([ xX])\](?:[ \t]+(.*?))?[ \t]*$").expect("valid bullet regex")
});

/// One table cell holding a checkbox, optionally with its own text.
static CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:-[ \t]+)?\[([ xX])\](?:[ \t]+(.*?))?[ \t]*$").expect("valid cell regex")
});

/// `|---|:--:|` style separator cells.
static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*:?-+:?[ \t]*$").expect("valid separator regex"));

/// How the item was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// `- [ ] text`
    BulletDash,
    /// `* [ ] text`
    BulletStar,
    /// A checkbox inside a markdown table row.
    TableRow,
}

/// One checkbox in a task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// 1-based ordinal in document order.
    pub id: usize,
    /// Item text; for bare table checkboxes, the nearest preceding cell.
    pub text: String,
    /// Whether the box is ticked.
    pub completed: bool,
    /// 0-based line index in the document.
    pub line: usize,
    /// Absolute byte offset of the mark character between the brackets.
    pub mark_offset: usize,
    /// Syntax the item was written in.
    pub kind: ItemKind,
}

/// A checkbox recognized on a single line, before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineMatch {
    pub text: String,
    pub completed: bool,
    /// Offset of the mark relative to the start of the line.
    pub mark_col: usize,
    pub kind: ItemKind,
}

fn is_ticked(mark: &str) -> bool {
    mark.eq_ignore_ascii_case("x")
}

/// Recognize a checklist item on one line (without its line ending).
pub(crate) fn match_line(line: &str) -> Option<LineMatch> {
    if let Some(caps) = BULLET.captures(line) {
        let mark = caps.get(2)?;
        let kind = if &caps[1] == "*" { ItemKind::BulletStar } else { ItemKind::BulletDash };
        return Some(LineMatch {
            text: caps.get(3).map_or("", |m| m.as_str()).trim().to_string(),
            completed: is_ticked(mark.as_str()),
            mark_col: mark.start(),
            kind,
        });
    }
    if line.trim_start().starts_with('|') {
        return match_table_row(line);
    }
    None
}

fn match_table_row(line: &str) -> Option<LineMatch> {
    let mut preceding = String::new();
    let mut cell_start = 0;
    for cell in line.split('|') {
        let start = cell_start;
        cell_start += cell.len() + 1;
        if SEPARATOR_CELL.is_match(cell) {
            continue;
        }
        if let Some(caps) = CELL.captures(cell) {
            let mark = caps.get(1)?;
            let own = caps.get(2).map_or("", |m| m.as_str()).trim();
            let text = if own.is_empty() { preceding } else { own.to_string() };
            return Some(LineMatch {
                text,
                completed: is_ticked(mark.as_str()),
                mark_col: start + mark.start(),
                kind: ItemKind::TableRow,
            });
        }
        let trimmed = cell.trim();
        if !trimmed.is_empty() {
            preceding = trimmed.to_string();
        }
    }
    None
}
