//! Recording adapter for the `IdGenerator` port.

use super::{record_interaction, SharedRecorder};
use crate::ports::IdGenerator;

/// Records every id handed out by an inner generator.
pub struct RecordingIdGenerator {
    inner: Box<dyn IdGenerator>,
    recorder: SharedRecorder,
}

impl RecordingIdGenerator {
    /// Wrap `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn IdGenerator>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl IdGenerator for RecordingIdGenerator {
    fn generate_id(&self) -> String {
        let result = self.inner.generate_id();
        record_interaction(&self.recorder, "id_gen", "generate_id", &(), &result);
        result
    }
}
