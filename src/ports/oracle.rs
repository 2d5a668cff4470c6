//! Verification oracle port.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Boxed future type alias used by [`OracleClient`] to keep the trait dyn-compatible.
pub type OracleFuture<'a> = Pin<Box<dyn Future<Output = Result<OracleResponse>> + Send + 'a>>;

/// A binary attachment sent alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// A single judging request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    /// The model identifier (e.g. `"claude-sonnet-4-20250514"`).
    pub model: String,
    /// Instructions, criteria and the expected response shape.
    pub prompt: String,
    /// Images referenced by the prompt, in order.
    pub attachments: Vec<Attachment>,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
}

/// The oracle's free-text answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    /// The generated text; expected to contain a JSON block.
    pub text: String,
    /// Number of prompt tokens consumed.
    pub prompt_tokens: u32,
    /// Number of completion tokens generated.
    pub completion_tokens: u32,
}

/// An external, vision-capable judge.
pub trait OracleClient: Send + Sync {
    /// Submit a request and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OracleUnavailable`] if the oracle cannot be
    /// reached or rejects the request.
    fn judge(&self, request: &OracleRequest) -> OracleFuture<'_>;
}
