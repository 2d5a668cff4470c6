//! Baseline regression comparison through the oracle.

use serde::Serialize;
use serde_json::Value;

use super::prompt::compare_prompt;
use super::response::{string, strings, structured};
use super::{ask, attachments};
use crate::capture::{Capture, CapturePayload};
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// The oracle's judgment of a capture against a baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// No regression found.
    pub matches: bool,
    /// Similarity in `[0, 1]`.
    pub similarity: f64,
    /// Differences found.
    pub differences: Vec<String>,
    /// Free-text analysis.
    pub analysis: String,
    /// Fixes to consider when a regression was found.
    pub suggested_fixes: Vec<String>,
}

/// Compare `current` against `baseline` with one oracle call.
///
/// # Errors
///
/// Returns [`Error::Parse`] when comparing text with an image,
/// [`Error::OracleUnavailable`] if the oracle fails, and
/// [`Error::OracleResponseMalformed`] if the answer lacks a boolean
/// `matches` or has a similarity outside `[0, 1]`.
pub async fn compare(
    ctx: &ServiceContext,
    baseline: &Capture,
    current: &Capture,
) -> Result<ComparisonResult> {
    if std::mem::discriminant(baseline.payload()) != std::mem::discriminant(current.payload()) {
        return Err(Error::Parse(format!(
            "cannot compare a {} baseline with a {} capture",
            baseline.mime(),
            current.mime()
        )));
    }
    let prompt = compare_prompt(baseline, current, ctx.config.text_limit);
    let images = match current.payload() {
        CapturePayload::Image(_) => attachments([baseline, current]),
        CapturePayload::Text(_) => Vec::new(),
    };
    let answer = ask(ctx, prompt, images).await?;
    let result = parse_comparison(&answer)?;
    tracing::info!(matches = result.matches, similarity = result.similarity, "baseline compared");
    Ok(result)
}

pub(crate) fn parse_comparison(answer: &str) -> Result<ComparisonResult> {
    let map = structured(answer, "matches")?;
    let matches = map
        .get("matches")
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::OracleResponseMalformed("matches is not a boolean".into()))?;
    let similarity = match map.get("similarity_score") {
        None | Some(Value::Null) => {
            if matches {
                1.0
            } else {
                0.0
            }
        }
        Some(v) => v
            .as_f64()
            .filter(|s| (0.0..=1.0).contains(s))
            .ok_or_else(|| Error::OracleResponseMalformed(format!("similarity_score {v} not in [0, 1]")))?,
    };
    Ok(ComparisonResult {
        matches,
        similarity,
        differences: strings(&map, "differences"),
        analysis: string(&map, "analysis"),
        suggested_fixes: strings(&map, "suggested_fixes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{TargetKind, TargetSpec};
    use crate::testing::{test_context, ScriptedOracle, PNG};

    #[tokio::test]
    async fn image_comparison_attaches_both_images() {
        let oracle = ScriptedOracle::replying([
            "```json\n{\"matches\": false, \"similarity_score\": 0.82, \"differences\": [\"button moved\"], \"analysis\": \"layout shift\", \"suggested_fixes\": [\"restore margin\"]}\n```",
        ]);
        let mut ctx = test_context();
        ctx.oracle = Box::new(oracle.clone());
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        let baseline = Capture::new(&ctx, CapturePayload::Image(PNG.to_vec()), &target, "screenshot");
        let current = Capture::new(&ctx, CapturePayload::Image(PNG.to_vec()), &target, "screenshot");

        let result = compare(&ctx, &baseline, &current).await.unwrap();
        assert!(!result.matches);
        assert!((result.similarity - 0.82).abs() < f64::EPSILON);
        assert_eq!(result.differences, ["button moved"]);
        assert_eq!(oracle.last_request().unwrap().attachments.len(), 2);
    }

    #[tokio::test]
    async fn text_comparison_inlines_both_outputs() {
        let oracle = ScriptedOracle::replying([r#"{"matches": true}"#]);
        let mut ctx = test_context();
        ctx.oracle = Box::new(oracle.clone());
        let target = TargetSpec::new(TargetKind::Tui, "htop");
        let baseline = Capture::new(&ctx, CapturePayload::Text("CPU 1%".into()), &target, "screenshot");
        let current = Capture::new(&ctx, CapturePayload::Text("CPU 2%".into()), &target, "screenshot");

        let result = compare(&ctx, &baseline, &current).await.unwrap();
        assert!(result.matches);
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
        let prompt = oracle.last_request().unwrap().prompt;
        assert!(prompt.contains("CPU 1%") && prompt.contains("CPU 2%"));
    }

    #[tokio::test]
    async fn mixed_payloads_are_rejected() {
        let ctx = test_context();
        let target = TargetSpec::new(TargetKind::Tui, "htop");
        let text = Capture::new(&ctx, CapturePayload::Text("x".into()), &target, "screenshot");
        let image = Capture::new(&ctx, CapturePayload::Image(PNG.to_vec()), &target, "screenshot");
        assert!(matches!(compare(&ctx, &text, &image).await, Err(Error::Parse(_))));
    }

    #[test]
    fn strict_parsing() {
        assert!(matches!(
            parse_comparison(r#"{"matches": "yes"}"#),
            Err(Error::OracleResponseMalformed(_))
        ));
        assert!(matches!(
            parse_comparison(r#"{"matches": true, "similarity_score": 3}"#),
            Err(Error::OracleResponseMalformed(_))
        ));
        assert!(matches!(parse_comparison("no idea"), Err(Error::OracleResponseMalformed(_))));
    }
}
