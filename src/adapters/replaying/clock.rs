//! Replaying adapter for the `Clock` port.

use chrono::{DateTime, Utc};

use super::{next_output, SharedReplayer};
use crate::ports::clock::Clock;

/// Serves recorded timestamps.
pub struct ReplayingClock {
    replayer: SharedReplayer,
}

impl ReplayingClock {
    /// Serve timestamps from `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl Clock for ReplayingClock {
    /// # Panics
    ///
    /// Panics when the cassette holds no further timestamps; a replayed run
    /// that diverges from its recording is a test failure.
    fn now(&self) -> DateTime<Utc> {
        let output = next_output(&self.replayer, "clock", "now").unwrap_or_else(|e| panic!("{e}"));
        serde_json::from_value(output)
            .unwrap_or_else(|e| panic!("clock::now: recorded value is not a timestamp: {e}"))
    }
}
