//! Todo snapshots from the agent's task tracker.

use serde::{Deserialize, Serialize};

use crate::checklist::item::match_line;
use crate::error::{Error, Result};

/// Status of a todo as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not started.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TodoStatus {
    /// Map a tracker status string; anything unrecognized is pending.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "completed" | "done" => Self::Completed,
            "in_progress" => Self::InProgress,
            _ => Self::Pending,
        }
    }
}

/// One todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Todo {
    /// What is to be done.
    pub content: String,
    /// Tracker status.
    pub status: TodoStatus,
    /// Present-continuous form shown while in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
}

impl Todo {
    /// A todo with no active form.
    #[must_use]
    pub fn new(content: impl Into<String>, status: TodoStatus) -> Self {
        Self { content: content.into(), status, active_form: None }
    }

    /// Whether the todo is done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TodoStatus::Completed
    }
}

#[derive(Deserialize)]
struct RawTodo {
    #[serde(default)]
    content: String,
    #[serde(default)]
    status: String,
    #[serde(default, rename = "activeForm", alias = "active_form")]
    active_form: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<RawTodo>),
    Wrapped { todos: Vec<RawTodo> },
}

/// Parse a todo snapshot.
///
/// Accepts a TodoWrite JSON payload (a bare array or `{"todos": [...]}`), or
/// a markdown task list where `[x]` is completed and `[ ]` pending.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the text looks like JSON but is not a todo
/// payload.
pub fn parse_todos(text: &str) -> Result<Vec<Todo>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let payload: Payload = serde_json::from_str(trimmed)
            .map_err(|e| Error::Parse(format!("todo payload: {e}")))?;
        let raw = match payload {
            Payload::List(todos) | Payload::Wrapped { todos } => todos,
        };
        return Ok(raw
            .into_iter()
            .map(|t| Todo {
                content: t.content,
                status: TodoStatus::from_label(&t.status),
                active_form: t.active_form.filter(|f| !f.is_empty()),
            })
            .collect());
    }

    Ok(text
        .lines()
        .filter_map(match_line)
        .map(|m| {
            let status = if m.completed { TodoStatus::Completed } else { TodoStatus::Pending };
            Todo::new(m.text, status)
        })
        .collect())
}
