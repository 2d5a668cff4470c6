//! Locating and reading the structured block in an oracle answer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence regex"));

/// First JSON object in `text` carrying `key` or an `error` field.
///
/// Fenced ```json blocks are tried first, then every `{` in the text in
/// order. Surrounding prose is ignored.
pub(crate) fn find_object(text: &str, key: &str) -> Option<Map<String, Value>> {
    let wanted = |value: Value| match value {
        Value::Object(map) if map.contains_key(key) || map.contains_key("error") => Some(map),
        _ => None,
    };

    for caps in FENCED_JSON.captures_iter(text) {
        if let Some(map) = serde_json::from_str(&caps[1]).ok().and_then(wanted) {
            return Some(map);
        }
    }
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(std::result::Result::ok)
            .and_then(wanted)
    })
}

/// Locate the object with `key`, turning an `error` payload into
/// [`Error::OracleUnavailable`].
pub(crate) fn structured(text: &str, key: &str) -> Result<Map<String, Value>> {
    let map = find_object(text, key).ok_or_else(|| {
        Error::OracleResponseMalformed(format!("no JSON object with a {key:?} field"))
    })?;
    if let Some(err) = map.get("error").filter(|_| !map.contains_key(key)) {
        let message = err.as_str().map_or_else(|| err.to_string(), str::to_string);
        return Err(Error::OracleUnavailable(message));
    }
    Ok(map)
}

pub(crate) fn string(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

pub(crate) fn strings(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// A non-negative integer field; absent is `None`, anything else malformed.
pub(crate) fn count(map: &Map<String, Value>, key: &str) -> Result<Option<usize>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| Error::OracleResponseMalformed(format!("{key} is not a count: {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_wins_over_prose() {
        let text = "Here you go {not json}\n```json\n{\"summary\": {\"total\": 1}}\n```\nthanks";
        let map = structured(text, "summary").unwrap();
        assert_eq!(map["summary"]["total"], 1);
    }

    #[test]
    fn bare_object_inside_prose_is_found() {
        let text = "I looked. {\"note\": 1} Result: {\"summary\": {\"passed\": 2}, \"recommendation\": \"ship\"} done";
        let map = structured(text, "summary").unwrap();
        assert_eq!(string(&map, "recommendation"), "ship");
    }

    #[test]
    fn missing_block_is_malformed() {
        assert!(matches!(structured("all good!", "summary"), Err(Error::OracleResponseMalformed(_))));
    }

    #[test]
    fn error_payload_is_unavailable() {
        let err = structured("{\"error\": \"rate limited\"}", "summary").unwrap_err();
        assert!(matches!(err, Error::OracleUnavailable(ref m) if m == "rate limited"));
    }

    #[test]
    fn counts_must_be_non_negative_integers() {
        let map = find_object("{\"summary\": 1, \"a\": 3, \"b\": -1}", "summary").unwrap();
        assert_eq!(count(&map, "a").unwrap(), Some(3));
        assert_eq!(count(&map, "c").unwrap(), None);
        assert!(count(&map, "b").is_err());
    }
}
