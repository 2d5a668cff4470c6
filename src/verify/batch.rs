//! Batch verification of captures against a task document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::prompt::batch_prompt;
use super::response::{count, string, strings, structured};
use super::{ask, attachments};
use crate::capture::Capture;
use crate::checklist::TaskDocument;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Judgment of one checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    /// The captures show the item done.
    Completed,
    /// The captures show the item not done.
    NotCompleted,
    /// Could not be determined, or sources disagree.
    Uncertain,
}

impl VerdictStatus {
    /// Map an oracle label; unknown labels are `Uncertain`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "completed" | "complete" | "done" | "pass" | "passed" => Self::Completed,
            "not_completed" | "incomplete" | "not_done" | "fail" | "failed" => Self::NotCompleted,
            _ => Self::Uncertain,
        }
    }
}

/// Judgment of one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    /// Shows the expected state.
    Pass,
    /// Shows a problem.
    Fail,
    /// Inconclusive.
    Uncertain,
}

impl CaptureStatus {
    /// Map an oracle label; unknown labels are `Uncertain`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "pass" | "passed" => Self::Pass,
            "fail" | "failed" => Self::Fail,
            _ => Self::Uncertain,
        }
    }

    fn verdict(self) -> VerdictStatus {
        match self {
            Self::Pass => VerdictStatus::Completed,
            Self::Fail => VerdictStatus::NotCompleted,
            Self::Uncertain => VerdictStatus::Uncertain,
        }
    }
}

/// Overall status reported for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Everything passed.
    Pass,
    /// Something failed.
    Fail,
    /// Some passed.
    Partial,
    /// Not reported, or an unknown label.
    Uncertain,
}

impl OverallStatus {
    fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "pass" | "passed" => Self::Pass,
            "fail" | "failed" => Self::Fail,
            "partial" => Self::Partial,
            _ => Self::Uncertain,
        }
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Verdict for one checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Checklist item id.
    pub item: usize,
    /// Judgment.
    pub status: VerdictStatus,
    /// What the oracle saw.
    pub evidence: String,
}

/// Per-capture analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDetail {
    /// 1-based position in the batch.
    pub index: usize,
    /// Capture id.
    pub capture_id: String,
    /// Judgment.
    pub status: CaptureStatus,
    /// What the oracle saw.
    pub evidence: String,
    /// Items the oracle says this capture verifies.
    pub items_verified: Vec<String>,
    /// Problems visible in this capture.
    pub issues: Vec<String>,
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// Captures judged.
    pub total: usize,
    /// Captures that passed.
    pub passed: usize,
    /// Captures that failed.
    pub failed: usize,
    /// Inconclusive captures.
    pub uncertain: usize,
    /// Problems found across the batch.
    pub issues: Vec<String>,
    /// Item verdicts, by item id.
    pub verdicts: Vec<Verdict>,
    /// Every checklist item is ticked or has a `Completed` verdict.
    pub all_completed: bool,
    /// Per-capture analysis; only filled in detailed mode.
    pub details: Vec<CaptureDetail>,
    /// Reported overall status.
    pub overall: OverallStatus,
    /// Suggested next step.
    pub recommendation: String,
}

impl BatchResult {
    fn empty(document: &TaskDocument) -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            uncertain: 0,
            issues: Vec::new(),
            verdicts: Vec::new(),
            all_completed: all_completed(document, &[]),
            details: Vec::new(),
            overall: OverallStatus::Uncertain,
            recommendation: String::new(),
        }
    }

    /// One-line count summary.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{}/{} passed, {} failed, {} uncertain",
            self.passed, self.total, self.failed, self.uncertain
        )
    }

    /// Verdict for an item, if any.
    #[must_use]
    pub fn verdict(&self, item: usize) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.item == item)
    }
}

/// A capture, optionally bound to the checklist item it is evidence for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// The capture.
    pub capture: Capture,
    /// Bound checklist item id.
    pub item: Option<usize>,
}

impl Evidence {
    /// Evidence for the task as a whole.
    #[must_use]
    pub fn unbound(capture: Capture) -> Self {
        Self { capture, item: None }
    }

    /// Evidence for one checklist item.
    #[must_use]
    pub fn for_item(capture: Capture, item: usize) -> Self {
        Self { capture, item: Some(item) }
    }
}

/// Everything one batch needs.
#[derive(Debug, Clone)]
pub struct VerifyRequest<'a> {
    /// Task being verified.
    pub document: &'a TaskDocument,
    /// Captures, in the order they were taken.
    pub evidence: Vec<Evidence>,
    /// Surface per-capture analysis.
    pub detailed: bool,
    /// Extra context for the oracle.
    pub context: Option<String>,
}

/// Judge a batch with exactly one oracle call.
///
/// An empty batch returns zero counts without calling the oracle.
///
/// # Errors
///
/// Returns [`Error::ItemNotFound`] for evidence bound to a missing item,
/// [`Error::OracleUnavailable`] if the oracle fails, times out or reports
/// an error, and [`Error::OracleResponseMalformed`] if its answer has no
/// usable structured block.
pub async fn verify(ctx: &ServiceContext, request: &VerifyRequest<'_>) -> Result<BatchResult> {
    let document = request.document;
    if let Some(missing) =
        request.evidence.iter().filter_map(|e| e.item).find(|id| document.item(*id).is_none())
    {
        return Err(Error::ItemNotFound(missing));
    }
    if request.evidence.is_empty() {
        tracing::debug!("empty batch; oracle not called");
        return Ok(BatchResult::empty(document));
    }

    let prompt = batch_prompt(
        document,
        &request.evidence,
        request.detailed,
        request.context.as_deref(),
        ctx.config.text_limit,
    );
    let images = attachments(request.evidence.iter().map(|e| &e.capture));
    let answer = ask(ctx, prompt, images).await?;
    let result = parse_batch(&answer, document, &request.evidence, request.detailed)?;
    tracing::info!(summary = %result.summary_line(), "batch verified");
    Ok(result)
}

/// Interpret an oracle answer for a batch.
pub(crate) fn parse_batch(
    answer: &str,
    document: &TaskDocument,
    evidence: &[Evidence],
    detailed: bool,
) -> Result<BatchResult> {
    let map = structured(answer, "summary")?;
    let summary = map
        .get("summary")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::OracleResponseMalformed("summary is not an object".into()))?;

    let total = evidence.len();
    if let Some(reported) = count(summary, "total")?.filter(|t| *t != total) {
        tracing::warn!(reported, sent = total, "oracle total differs from batch size");
    }
    let passed = bounded_count(summary, "passed", total)?.unwrap_or(0);
    let failed = bounded_count(summary, "failed", total)?.unwrap_or(0);
    let judged = passed.checked_add(failed).filter(|n| *n <= total).ok_or_else(|| {
        Error::OracleResponseMalformed(format!(
            "counts {passed}+{failed} exceed the {total} captures sent"
        ))
    })?;
    let uncertain = bounded_count(summary, "uncertain", total)?.unwrap_or(total - judged);
    if judged + uncertain > total {
        return Err(Error::OracleResponseMalformed(format!(
            "counts {passed}+{failed}+{uncertain} exceed the {total} captures sent"
        )));
    }

    let details = parse_details(&map, evidence);
    let verdicts = merge_verdicts(document, evidence, &map, &details);

    Ok(BatchResult {
        total,
        passed,
        failed,
        uncertain,
        issues: strings(summary, "issues"),
        all_completed: all_completed(document, &verdicts),
        verdicts,
        details: if detailed { details } else { Vec::new() },
        overall: OverallStatus::from_label(&string(summary, "overall_status")),
        recommendation: string(&map, "recommendation"),
    })
}

/// A summary count that cannot exceed the batch size on its own.
fn bounded_count(summary: &Map<String, Value>, key: &str, total: usize) -> Result<Option<usize>> {
    match count(summary, key)? {
        Some(n) if n > total => Err(Error::OracleResponseMalformed(format!(
            "{key} count {n} exceeds the {total} captures sent"
        ))),
        other => Ok(other),
    }
}

fn parse_details(map: &Map<String, Value>, evidence: &[Evidence]) -> Vec<CaptureDetail> {
    let Some(entries) = map.get("details").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let entry = entry.as_object()?;
            let index = count(entry, "image_index").ok().flatten().unwrap_or(position + 1);
            let Some(ev) = index.checked_sub(1).and_then(|i| evidence.get(i)) else {
                tracing::warn!(index, "detail refers to a capture outside the batch");
                return None;
            };
            Some(CaptureDetail {
                index,
                capture_id: ev.capture.id().to_string(),
                status: CaptureStatus::from_label(&string(entry, "status")),
                evidence: string(entry, "evidence"),
                items_verified: strings(entry, "task_items_verified"),
                issues: strings(entry, "issues"),
            })
        })
        .collect()
}

fn item_id(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

/// Combine item verdicts reported directly with those implied by bound
/// captures. Disagreement on an item yields `Uncertain`.
fn merge_verdicts(
    document: &TaskDocument,
    evidence: &[Evidence],
    map: &Map<String, Value>,
    details: &[CaptureDetail],
) -> Vec<Verdict> {
    let mut found: BTreeMap<usize, Vec<(VerdictStatus, String)>> = BTreeMap::new();

    for entry in map.get("items").and_then(Value::as_array).into_iter().flatten() {
        let Some(entry) = entry.as_object() else { continue };
        match item_id(entry.get("id")).filter(|id| document.item(*id).is_some()) {
            Some(id) => found.entry(id).or_default().push((
                VerdictStatus::from_label(&string(entry, "status")),
                string(entry, "evidence"),
            )),
            None => tracing::warn!(id = ?entry.get("id"), "verdict for unknown checklist item ignored"),
        }
    }
    for detail in details {
        if let Some(item) = evidence[detail.index - 1].item {
            found.entry(item).or_default().push((detail.status.verdict(), detail.evidence.clone()));
        }
    }

    found
        .into_iter()
        .map(|(item, reports)| {
            let first = reports[0].0;
            let agreed = reports.iter().all(|(status, _)| *status == first);
            let evidence = reports
                .iter()
                .map(|(_, e)| e.as_str())
                .filter(|e| !e.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            if agreed {
                Verdict { item, status: first, evidence }
            } else {
                Verdict {
                    item,
                    status: VerdictStatus::Uncertain,
                    evidence: format!("conflicting verdicts: {evidence}"),
                }
            }
        })
        .collect()
}

fn all_completed(document: &TaskDocument, verdicts: &[Verdict]) -> bool {
    !document.items.is_empty()
        && document.items.iter().all(|item| {
            item.completed
                || verdicts
                    .iter()
                    .any(|v| v.item == item.id && v.status == VerdictStatus::Completed)
        })
}

/// Tick every item whose verdict is `Completed`. Returns the new document
/// and the ids that changed.
///
/// # Errors
///
/// Returns [`Error::ItemNotFound`] if a verdict names an item missing from
/// `document`.
pub fn apply(document: &TaskDocument, result: &BatchResult) -> Result<(TaskDocument, Vec<usize>)> {
    let mut next = document.clone();
    let mut flipped = Vec::new();
    for verdict in result.verdicts.iter().filter(|v| v.status == VerdictStatus::Completed) {
        let was_open = next.item(verdict.item).is_some_and(|i| !i.completed);
        next = next.mark_complete(verdict.item)?;
        if was_open {
            flipped.push(verdict.item);
        }
    }
    Ok((next, flipped))
}
