//! Recording adapter for the `OracleClient` port.

use serde::Serialize;

use super::{record_result, SharedRecorder};
use crate::ports::oracle::{OracleClient, OracleFuture, OracleRequest};

/// Records oracle verdicts while delegating to an inner client.
///
/// Attachments are recorded as sizes only; the prompt is kept verbatim so
/// a cassette shows what the oracle was asked.
pub struct RecordingOracleClient {
    inner: Box<dyn OracleClient>,
    recorder: SharedRecorder,
}

impl RecordingOracleClient {
    /// Wrap `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn OracleClient>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct RecordedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    attachments: Vec<RecordedAttachment<'a>>,
}

#[derive(Serialize)]
struct RecordedAttachment<'a> {
    media_type: &'a str,
    encoded_len: usize,
}

impl OracleClient for RecordingOracleClient {
    fn judge(&self, request: &OracleRequest) -> OracleFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.judge(&request).await;
            let digest = RecordedRequest {
                model: &request.model,
                prompt: &request.prompt,
                attachments: request
                    .attachments
                    .iter()
                    .map(|a| RecordedAttachment { media_type: &a.media_type, encoded_len: a.data.len() })
                    .collect(),
            };
            record_result(&self.recorder, "oracle", "judge", &digest, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Cassette;
    use crate::cassette::recorder::CassetteRecorder;
    use crate::error::Error;
    use crate::ports::oracle::{Attachment, OracleResponse};
    use std::sync::{Arc, Mutex};

    struct CannedOracle(bool);

    impl OracleClient for CannedOracle {
        fn judge(&self, _request: &OracleRequest) -> OracleFuture<'_> {
            let ok = self.0;
            Box::pin(async move {
                if ok {
                    Ok(OracleResponse {
                        text: "{\"summary\": {}}".into(),
                        prompt_tokens: 10,
                        completion_tokens: 2,
                    })
                } else {
                    Err(Error::OracleUnavailable("rate limited".into()))
                }
            })
        }
    }

    fn request() -> OracleRequest {
        OracleRequest {
            model: "m".into(),
            prompt: "judge".into(),
            attachments: vec![Attachment { media_type: "image/png".into(), data: "QUJD".into() }],
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn records_success_and_failure_with_attachment_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "oracle")));

        let ok = RecordingOracleClient::new(Box::new(CannedOracle(true)), Arc::clone(&recorder));
        let failing =
            RecordingOracleClient::new(Box::new(CannedOracle(false)), Arc::clone(&recorder));
        assert!(ok.judge(&request()).await.is_ok());
        assert!(failing.judge(&request()).await.is_err());

        recorder.lock().unwrap().write().unwrap();
        let cassette = Cassette::from_yaml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &cassette.interactions[0];
        assert_eq!(first.input["attachments"][0]["encoded_len"], 4);
        assert!(first.input.get("data").is_none());
        assert_eq!(first.output["Ok"]["prompt_tokens"], 10);
        assert_eq!(
            cassette.interactions[1].output["Err"],
            "oracle unavailable: rate limited"
        );
    }
}
