//! Trigger rules over a todo snapshot.

use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use super::phase::{classify, find_keyword, tokens, Phase, VERIFICATION_KEYWORDS};
use super::todo::{Todo, TodoStatus};

/// Urgency of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// A unit of work finished.
    Normal,
    /// All work finished; final check.
    High,
}

/// A rule that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Trigger {
    /// Every todo is completed.
    AllComplete,
    /// The last completed todo names a verification keyword.
    KeywordMatch {
        /// Content of the completed todo.
        todo: String,
        /// Keyword that matched.
        keyword: String,
    },
    /// Every todo of the last completed todo's phase is completed.
    PhaseComplete {
        /// The finished phase.
        phase: Phase,
    },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllComplete => f.write_str("all todos completed - final verification"),
            Self::KeywordMatch { todo, keyword } => {
                write!(f, "verification keyword '{keyword}' in completed todo: {todo}")
            }
            Self::PhaseComplete { phase } => write!(f, "phase '{phase}' completed"),
        }
    }
}

/// Todo counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoCounts {
    /// Completed todos.
    pub completed: usize,
    /// Pending todos.
    pub pending: usize,
    /// In-progress todos.
    pub in_progress: usize,
    /// All todos.
    pub total: usize,
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationContext {
    /// Whether any rule fired.
    pub should_verify: bool,
    /// Description of the primary trigger.
    pub reason: String,
    /// `High` when everything is done.
    pub priority: Priority,
    /// Phase the decision is about.
    pub phase: Phase,
    /// Completed fraction; `None` for an empty list.
    pub progress: Option<f64>,
    /// Every rule that fired, primary first.
    pub triggers: Vec<Trigger>,
    /// Counts by status.
    pub counts: TodoCounts,
}

/// Decide whether verification is due.
///
/// Rules are evaluated against the most recently completed todo (the last
/// completed one in list order): a verification keyword in its content,
/// completion of its whole phase, completion of every todo. The primary
/// trigger is the all-complete rule, then the keyword rule, then the phase
/// rule.
#[must_use]
pub fn evaluate(todos: &[Todo]) -> VerificationContext {
    let counts = TodoCounts {
        completed: todos.iter().filter(|t| t.status == TodoStatus::Completed).count(),
        pending: todos.iter().filter(|t| t.status == TodoStatus::Pending).count(),
        in_progress: todos.iter().filter(|t| t.status == TodoStatus::InProgress).count(),
        total: todos.len(),
    };
    #[allow(clippy::cast_precision_loss)]
    let progress = (counts.total > 0).then(|| counts.completed as f64 / counts.total as f64);

    let phases: Vec<Phase> = todos.iter().map(|t| classify(&t.content)).collect();
    let last_completed = todos.iter().rposition(Todo::is_completed);

    let mut triggers = Vec::new();
    if let Some(last) = last_completed {
        if counts.completed == counts.total {
            triggers.push(Trigger::AllComplete);
        }
        if let Some(keyword) = find_keyword(&tokens(&todos[last].content), VERIFICATION_KEYWORDS) {
            triggers.push(Trigger::KeywordMatch {
                todo: todos[last].content.clone(),
                keyword: keyword.to_string(),
            });
        }
        let phase = phases[last];
        let phase_done = todos
            .iter()
            .zip(&phases)
            .filter(|(_, p)| **p == phase)
            .all(|(t, _)| t.is_completed());
        if phase != Phase::Unknown && phase_done {
            triggers.push(Trigger::PhaseComplete { phase });
        }
    }

    let phase = if triggers.is_empty() {
        todos
            .iter()
            .position(|t| t.status == TodoStatus::InProgress)
            .or(last_completed)
            .map_or(Phase::Unknown, |i| phases[i])
    } else {
        last_completed.map_or(Phase::Unknown, |i| phases[i])
    };
    let priority =
        if triggers.first() == Some(&Trigger::AllComplete) { Priority::High } else { Priority::Normal };

    VerificationContext {
        should_verify: !triggers.is_empty(),
        reason: triggers.first().map_or_else(|| "no verification needed".to_string(), ToString::to_string),
        priority,
        phase,
        progress,
        triggers,
        counts,
    }
}

/// Render the notice shown to the agent when verification is due, or
/// `None` when it is not.
#[must_use]
pub fn render_prompt(context: &VerificationContext, task_file: Option<&Path>) -> Option<String> {
    if !context.should_verify {
        return None;
    }
    let mut out = String::from("## Verification Trigger\n\n");
    out.push_str("Based on the current todo state, verification is recommended:\n\n");
    let _ = writeln!(out, "**Phase**: {}", context.phase);
    let _ = writeln!(
        out,
        "**Progress**: {}/{} completed",
        context.counts.completed, context.counts.total
    );
    if context.priority == Priority::High {
        out.push_str("**Priority**: high\n");
    }
    out.push_str("\n**Triggers**:\n");
    for trigger in &context.triggers {
        let _ = writeln!(out, "  - {trigger}");
    }
    out.push('\n');
    match task_file {
        Some(path) => {
            let _ = writeln!(out, "**Task File**: {}\n", path.display());
            let _ = writeln!(out, "Run `glimpse verify {}` to verify the current state.", path.display());
        }
        None => out.push_str("Consider running a verification to confirm the completed work.\n"),
    }
    Some(out)
}
