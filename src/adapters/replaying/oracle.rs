//! Replaying adapter for the `OracleClient` port.

use super::{next_output, replay_result, SharedReplayer};
use crate::error::Error;
use crate::ports::oracle::{OracleClient, OracleFuture, OracleRequest, OracleResponse};

/// Serves recorded oracle answers.
///
/// An exhausted cassette or a recorded failure surfaces as
/// [`Error::OracleUnavailable`], never as a verdict.
pub struct ReplayingOracleClient {
    replayer: SharedReplayer,
}

impl ReplayingOracleClient {
    /// Serve answers from `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl OracleClient for ReplayingOracleClient {
    fn judge(&self, _request: &OracleRequest) -> OracleFuture<'_> {
        let output = next_output(&self.replayer, "oracle", "judge");
        Box::pin(async move {
            output
                .and_then(replay_result::<OracleResponse>)
                .map_err(|msg| {
                    Error::OracleUnavailable(
                        msg.strip_prefix("oracle unavailable: ").unwrap_or(&msg).to_string(),
                    )
                })
        })
    }
}
