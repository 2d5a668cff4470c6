//! Oracle prompts.

use std::fmt::Write as _;

use super::batch::Evidence;
use crate::capture::{Capture, CapturePayload};
use crate::checklist::TaskDocument;

const TRUNCATED: &str = "\n... [truncated]";

/// Cut text captures at `limit` characters.
#[must_use]
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{TRUNCATED}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Prompt for one batch. Images are referenced by position among the
/// attachments; text captures are inlined.
#[must_use]
pub fn batch_prompt(
    document: &TaskDocument,
    evidence: &[Evidence],
    detailed: bool,
    context: Option<&str>,
    text_limit: usize,
) -> String {
    let n = evidence.len();
    let mut out = format!("You are verifying {n} captures against task criteria.\n\n");

    out.push_str("## Task\n");
    let title = if document.title.is_empty() { "(untitled)" } else { document.title.as_str() };
    let _ = writeln!(out, "{title}");
    if !document.description.is_empty() {
        let _ = writeln!(out, "\n{}", document.description);
    }

    out.push_str("\n## Task Items to Verify\n");
    if document.items.is_empty() {
        out.push_str("No specific items\n");
    }
    for item in &document.items {
        let mark = if item.completed { "x" } else { " " };
        let _ = writeln!(out, "{}. [{mark}] {}", item.id, item.text);
    }

    out.push_str("\n## Acceptance Criteria\n");
    if document.acceptance_criteria.is_empty() {
        out.push_str("Verify the captures show expected behavior\n");
    }
    for criterion in &document.acceptance_criteria {
        let _ = writeln!(out, "- {criterion}");
    }

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(out, "\n## Additional Context\n{context}");
    }

    let _ = write!(
        out,
        "\n## Captures\nYou are shown {n} captures in sequence. They may represent a user flow, \
         several states of one feature, or different features.\n\n"
    );
    let mut image = 0;
    for (i, ev) in evidence.iter().enumerate() {
        let _ = write!(out, "Capture {}: {} (event: {})", i + 1, describe(&ev.capture), ev.capture.event());
        if let Some(item) = ev.item {
            let _ = write!(out, ", evidence for item {item}");
        }
        match ev.capture.payload() {
            CapturePayload::Image(_) => {
                image += 1;
                let _ = writeln!(out, " - attached image {image}");
            }
            CapturePayload::Text(text) => {
                let _ = writeln!(out, "\n```\n{}\n```", truncate(text, text_limit));
            }
        }
    }

    out.push_str(
        "\n## Instructions\nAnalyze each capture and determine:\n\
         1. Which task items are satisfied\n\
         2. Any issues or problems visible\n\
         3. Overall verification status\n\n",
    );
    out.push_str(if detailed {
        "For each capture, provide detailed analysis.\n"
    } else {
        "Provide a summary of all captures.\n"
    });

    let _ = write!(
        out,
        r#"
## Response Format
Respond with valid JSON in this format:
```json
{{
    "summary": {{
        "total": {n},
        "passed": <count of captures that pass>,
        "failed": <count of captures that fail>,
        "uncertain": <count where you can't determine>,
        "overall_status": "pass|fail|partial",
        "issues": ["list of issues found across all captures"]
    }},
    "items": [
        {{"id": <item number>, "status": "completed|not_completed|uncertain", "evidence": "what shows it"}}
    ],
    "details": [
        {{
            "image_index": <capture number>,
            "status": "pass|fail|uncertain",
            "evidence": "what you observed",
            "task_items_verified": ["items this capture verifies"],
            "issues": ["any issues in this capture"]
        }}
    ],
    "recommendation": "brief recommendation for next steps"
}}
```
Only report an item as completed when a capture clearly shows it.
"#
    );
    out
}

/// Prompt for a baseline comparison.
#[must_use]
pub fn compare_prompt(baseline: &Capture, current: &Capture, text_limit: usize) -> String {
    let mut out = String::new();
    match (baseline.payload(), current.payload()) {
        (CapturePayload::Text(expected), CapturePayload::Text(actual)) => {
            out.push_str("Compare these two terminal outputs and identify any differences.\n\n");
            let _ = writeln!(out, "## Baseline Output (Expected)\n```\n{}\n```\n", truncate(expected, text_limit));
            let _ = writeln!(out, "## Current Output\n```\n{}\n```\n", truncate(actual, text_limit));
        }
        _ => {
            out.push_str(
                "Compare two screenshots to detect visual regressions. The first attached \
                 image is the baseline (expected state); the second is the current state.\n\n\
                 Check:\n\
                 1. Are there any visual differences?\n\
                 2. Do the layouts match?\n\
                 3. Are all expected elements present?\n\
                 4. Are colors, fonts, and spacing consistent?\n\n",
            );
        }
    }
    let _ = writeln!(out, "Target: {}", current.target());
    out.push_str(
        r#"
Respond in this JSON format:
```json
{
  "matches": true/false,
  "similarity_score": 0.0-1.0,
  "differences": ["list of differences found"],
  "analysis": "detailed analysis of what changed",
  "suggested_fixes": ["list of code fixes if regressions found"]
}
```
"#,
    );
    out
}

fn describe(capture: &Capture) -> String {
    let target = capture.target();
    format!("{} {}", target.kind, target.locator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("héllo wörld", 5), "héllo\n... [truncated]");
    }
}
