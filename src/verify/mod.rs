//! Oracle-backed verification.
//!
//! A batch of captures plus a task's acceptance criteria goes to the oracle
//! in exactly one request; the structured answer becomes per-item verdicts.
//! Baseline comparison uses the same oracle and the same parsing rules.

pub mod batch;
pub mod compare;
pub mod prompt;
pub mod response;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub use batch::{
    apply, verify, BatchResult, CaptureDetail, CaptureStatus, Evidence, OverallStatus, Verdict,
    VerdictStatus, VerifyRequest,
};
pub use compare::{compare, ComparisonResult};

use crate::capture::{Capture, CapturePayload};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::ports::{Attachment, OracleRequest};

/// Image payloads as base64 attachments, in capture order.
fn attachments<'c>(captures: impl IntoIterator<Item = &'c Capture>) -> Vec<Attachment> {
    captures
        .into_iter()
        .filter_map(|c| match c.payload() {
            CapturePayload::Image(bytes) => Some(Attachment {
                media_type: c.mime().to_string(),
                data: STANDARD.encode(bytes),
            }),
            CapturePayload::Text(_) => None,
        })
        .collect()
}

/// One bounded oracle call.
async fn ask(ctx: &ServiceContext, prompt: String, attachments: Vec<Attachment>) -> Result<String> {
    let request = OracleRequest {
        model: ctx.config.oracle_model.clone(),
        prompt,
        attachments,
        max_tokens: ctx.config.oracle_max_tokens,
    };
    let limit: Duration = ctx.config.oracle_timeout();
    let response = tokio::time::timeout(limit, ctx.oracle.judge(&request))
        .await
        .map_err(|_| {
            Error::OracleUnavailable(format!("no response within {}s", limit.as_secs()))
        })??;
    tracing::info!(
        model = %request.model,
        images = request.attachments.len(),
        prompt_tokens = response.prompt_tokens,
        completion_tokens = response.completion_tokens,
        "oracle answered"
    );
    Ok(response.text)
}
