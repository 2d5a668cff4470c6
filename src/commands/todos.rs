//! `glimpse todos` command.

use std::io::Read;
use std::path::Path;

use crate::context::ServiceContext;
use crate::engine::Engine;
use crate::trigger::{render_prompt, VerificationContext};

/// Execute the `todos` command.
///
/// Reads a todo snapshot from `file` (or stdin), evaluates the trigger
/// policy and prints the verification notice when one is due.
///
/// # Errors
///
/// Returns an error string if the input cannot be read or parsed.
pub fn run(ctx: &ServiceContext, file: Option<&Path>, task: Option<&Path>) -> Result<(), String> {
    let text = match file {
        Some(path) => ctx.fs.read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    let context = Engine::new(ctx).evaluate_todos(&text).map_err(|e| e.to_string())?;
    print!("{}", render(&context, task));
    Ok(())
}

/// The notice when verification is due, otherwise a one-line summary.
#[must_use]
pub fn render(context: &VerificationContext, task: Option<&Path>) -> String {
    render_prompt(context, task).unwrap_or_else(|| {
        format!(
            "No verification needed ({} of {} todos completed, phase: {}).\n",
            context.counts.completed, context.counts.total, context.phase
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{evaluate, parse_todos};

    #[test]
    fn quiet_when_nothing_fires() {
        let todos = parse_todos(r#"[{"content": "Write docs", "status": "pending"}]"#).unwrap();
        assert_eq!(
            render(&evaluate(&todos), None),
            "No verification needed (0 of 1 todos completed, phase: unknown).\n"
        );
    }

    #[test]
    fn notice_references_task_file() {
        let todos = parse_todos("- [x] Verify the login page renders\n- [ ] Ship it\n").unwrap();
        let out = render(&evaluate(&todos), Some(Path::new(".claude/login.md")));
        assert!(out.starts_with("## Verification Trigger"));
        assert!(out.contains("glimpse verify .claude/login.md"));
    }
}
