//! ID generator port for capture and session identifiers.

/// Generates unique identifiers.
///
/// Capture ids double as file stems in the capture store, so implementations
/// must only produce filesystem-safe strings.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
