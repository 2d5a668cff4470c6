//! Replaying adapter for the `IdGenerator` port.

use super::{next_output, SharedReplayer};
use crate::ports::id_gen::IdGenerator;

/// Serves recorded ids.
pub struct ReplayingIdGenerator {
    replayer: SharedReplayer,
}

impl ReplayingIdGenerator {
    /// Serve ids from `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl IdGenerator for ReplayingIdGenerator {
    fn generate_id(&self) -> String {
        let output = next_output(&self.replayer, "id_gen", "generate_id")
            .unwrap_or_else(|e| panic!("{e}"));
        match output.as_str() {
            Some(id) => id.to_string(),
            None => panic!("id_gen::generate_id: recorded value is not a string: {output}"),
        }
    }
}
