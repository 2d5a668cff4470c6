//! Live adapter for the `OracleClient` port using the Anthropic messages API.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ports::oracle::{OracleClient, OracleFuture, OracleRequest, OracleResponse};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Live oracle that asks a vision-capable Claude model to judge captures.
pub struct LiveOracleClient {
    client: Client,
}

impl LiveOracleClient {
    /// Creates a new live oracle client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveOracleClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body sent to the Anthropic messages API.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<RequestBlock<'a>>,
}

/// Content blocks: every image first, then the prompt text.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl OracleClient for LiveOracleClient {
    fn judge(&self, request: &OracleRequest) -> OracleFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
                Error::OracleUnavailable("ANTHROPIC_API_KEY environment variable not set".into())
            })?;

            let mut content: Vec<RequestBlock<'_>> = request
                .attachments
                .iter()
                .map(|a| RequestBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type: &a.media_type,
                        data: &a.data,
                    },
                })
                .collect();
            content.push(RequestBlock::Text { text: &request.prompt });

            let body = AnthropicRequest {
                model: &request.model,
                max_tokens: request.max_tokens,
                messages: vec![AnthropicMessage { role: "user", content }],
            };

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::OracleUnavailable(format!("request failed: {e}")))?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .map_err(|e| Error::OracleUnavailable(format!("failed to read response: {e}")))?;

            if !status.is_success() {
                let msg = serde_json::from_str::<AnthropicError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(Error::OracleUnavailable(format!(
                    "Anthropic API error ({}): {msg}",
                    status.as_u16()
                )));
            }

            let api_response: AnthropicResponse = serde_json::from_str(&response_text)
                .map_err(|e| Error::OracleUnavailable(format!("unexpected response body: {e}")))?;

            let text = api_response.content.into_iter().map(|block| block.text).collect::<String>();

            Ok(OracleResponse {
                text,
                prompt_tokens: api_response.usage.input_tokens,
                completion_tokens: api_response.usage.output_tokens,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_serialize_before_text() {
        let content = vec![
            RequestBlock::Image {
                source: ImageSource { kind: "base64", media_type: "image/png", data: "AAAA" },
            },
            RequestBlock::Text { text: "judge this" },
        ];
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json[0]["type"], "image");
        assert_eq!(json[0]["source"]["type"], "base64");
        assert_eq!(json[0]["source"]["media_type"], "image/png");
        assert_eq!(json[1]["type"], "text");
        assert_eq!(json[1]["text"], "judge this");
    }
}
