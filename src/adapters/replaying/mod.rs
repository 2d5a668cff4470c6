//! Replaying adapters that serve recorded interactions.

pub mod clock;
pub mod id_gen;
pub mod oracle;

pub use clock::ReplayingClock;
pub use id_gen::ReplayingIdGenerator;
pub use oracle::ReplayingOracleClient;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::replayer::CassetteReplayer;

/// Shared handle to the replayer of one cassette.
pub type SharedReplayer = Arc<Mutex<CassetteReplayer>>;

/// Pull the next recorded output for `port`/`method`.
///
/// # Errors
///
/// Returns a descriptive message when the cassette is exhausted.
pub(crate) fn next_output(
    replayer: &SharedReplayer,
    port: &str,
    method: &str,
) -> Result<Value, String> {
    let mut guard = replayer.lock().map_err(|_| "replayer lock poisoned".to_string())?;
    guard.next_interaction(port, method).map(|i| i.output)
}

/// Decode a recorded `{"Ok": v}` / `{"Err": msg}` output.
///
/// # Errors
///
/// Returns the recorded error message, or a decoding message when the
/// output has neither shape.
pub(crate) fn replay_result<T: DeserializeOwned>(output: Value) -> Result<T, String> {
    if let Some(ok) = output.get("Ok") {
        return serde_json::from_value(ok.clone()).map_err(|e| format!("recorded Ok value: {e}"));
    }
    if let Some(err) = output.get("Err") {
        return Err(err.as_str().map_or_else(|| err.to_string(), str::to_string));
    }
    Err(format!("recorded output is neither Ok nor Err: {output}"))
}
