//! Clock port for capture timestamps and baseline file names.

use chrono::{DateTime, Utc};

/// Provides the current time.
///
/// Captures, verification marks and baselines are stamped through this port
/// so recorded sessions replay with identical timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
