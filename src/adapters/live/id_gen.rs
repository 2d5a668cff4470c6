//! Live adapter for the `IdGenerator` port.

use chrono::Utc;
use uuid::Uuid;

use crate::ports::IdGenerator;

/// Capture ids of the form `cap-<UTC timestamp>-<8 hex digits>`.
///
/// The timestamp prefix keeps `captures/` listings in capture order; the
/// random suffix separates captures taken within the same second.
#[derive(Debug, Default)]
pub struct LiveIdGenerator;

impl LiveIdGenerator {
    /// Creates a new live ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("cap-{}-{}", Utc::now().format("%Y%m%dT%H%M%S"), &suffix[..8])
    }
}
