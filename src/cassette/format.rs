//! Cassette data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call on a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording, assigned by the recorder.
    pub seq: u64,
    /// Port name (`oracle`, `clock`, `id_gen`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Digest of the call's input. Attachments are summarized, not stored.
    pub input: serde_json::Value,
    /// Returned value, `Ok`/`Err` wrapped for fallible methods.
    pub output: serde_json::Value,
}

/// A named, ordered recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Version of the tool that produced the recording.
    #[serde(default)]
    pub tool_version: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Parse a cassette from YAML text.
    ///
    /// # Errors
    ///
    /// Returns the decoder message if the text is not a cassette.
    pub fn from_yaml(text: &str) -> Result<Self, String> {
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hand_written_cassette_without_version() {
        let yaml = r#"
name: login-flow
recorded_at: 2025-03-15T14:30:00Z
interactions:
  - seq: 0
    port: oracle
    method: judge
    input: {prompt_chars: 120, attachments: 2}
    output: {Ok: {text: "{}", prompt_tokens: 1, completion_tokens: 1}}
"#;
        let cassette = Cassette::from_yaml(yaml).unwrap();
        assert_eq!(cassette.name, "login-flow");
        assert!(cassette.tool_version.is_empty());
        assert_eq!(cassette.interactions[0].input, json!({"prompt_chars": 120, "attachments": 2}));
    }

    #[test]
    fn rejects_non_cassette_yaml() {
        assert!(Cassette::from_yaml("- just\n- a list\n").is_err());
    }
}
