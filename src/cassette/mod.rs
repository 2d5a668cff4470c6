//! Cassettes: YAML recordings of port interactions for deterministic replay.
//!
//! Set `GLIMPSE_RECORD=<file>` to record the oracle, clock and id traffic of
//! a CLI invocation; load the result with
//! [`crate::context::ServiceContext::replaying`].

pub mod format;
pub mod recorder;
pub mod replayer;
