//! Recording adapters that capture interactions to cassettes.

pub mod clock;
pub mod id_gen;
pub mod oracle;

pub use clock::RecordingClock;
pub use id_gen::RecordingIdGenerator;
pub use oracle::RecordingOracleClient;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use crate::cassette::recorder::CassetteRecorder;

/// Shared handle to the recorder of one invocation.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Record an interaction with an infallible return value.
///
/// Mirror of `replaying::next_output`.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let input = serde_json::to_value(input).unwrap_or(Value::Null);
    let output = serde_json::to_value(output).unwrap_or(Value::Null);
    if let Ok(mut guard) = recorder.lock() {
        guard.record(port, method, input, output);
    }
}

/// Record a `Result<T, E>` interaction using the Ok/Err JSON convention.
///
/// Mirror of `replaying::replay_result`:
/// - `Ok(v)` is serialized as `{"Ok": v}`
/// - `Err(e)` is serialized as `{"Err": e.to_string()}`
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::json!({ "Ok": serde_json::to_value(v).unwrap_or(Value::Null) }),
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };
    let input = serde_json::to_value(input).unwrap_or(Value::Null);
    if let Ok(mut guard) = recorder.lock() {
        guard.record(port, method, input, output);
    }
}
