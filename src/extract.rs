//! Defensive extraction of a flat field record from raw model output.
//!
//! Models asked for "ONLY the JSON object" still routinely wrap it in a
//! markdown fence, or reply with prose, a bare list, or nothing useful.
//! Extraction therefore never fails: anything that cannot be read as a
//! JSON object is preserved under the [`RAW_RESPONSE_KEY`] so no output is
//! silently lost.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Fallback key holding the unparsed response text.
pub const RAW_RESPONSE_KEY: &str = "Raw Response";

/// Flat mapping from field name to string value.
pub type FieldRecord = HashMap<String, String>;

// Full-wrap fence, optionally tagged `json`. Anchored on both ends so a
// fence appearing inside the payload is left alone.
static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*?)\n```$").unwrap());

/// Convert raw model output into a [`FieldRecord`]. Total — always returns
/// a mapping:
///
/// * JSON object → its entries, values coerced to strings.
/// * Other valid JSON (string, number, list, ...) → wrapped under
///   [`RAW_RESPONSE_KEY`], stringified.
/// * Anything unparsable → the *original* text (untrimmed, fences intact)
///   under [`RAW_RESPONSE_KEY`].
///
/// A valid-but-empty object `{}` extracts to an empty record; that is a
/// successful parse, not a fallback case.
pub fn extract_record(raw: &str) -> FieldRecord {
    let trimmed = raw.trim();
    let cleaned = match RE_JSON_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str().trim(),
        None => trimmed,
    };

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| (k, coerce_to_string(v)))
            .collect(),
        Ok(other) => {
            let mut record = FieldRecord::new();
            record.insert(RAW_RESPONSE_KEY.to_string(), coerce_to_string(other));
            record
        }
        Err(_) => {
            let mut record = FieldRecord::new();
            record.insert(RAW_RESPONSE_KEY.to_string(), raw.to_string());
            record
        }
    }
}

/// Strings pass through unquoted; everything else renders compactly.
fn coerce_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_object_round_trips() {
        let record = extract_record(r#"{"Summary": "ok", "Date": "2024-01-01"}"#);
        assert_eq!(record.len(), 2);
        assert_eq!(record["Summary"], "ok");
        assert_eq!(record["Date"], "2024-01-01");
    }

    #[test]
    fn fenced_object_matches_unfenced() {
        let plain = extract_record(r#"{"Summary": "ok"}"#);
        let fenced = extract_record("```json\n{\"Summary\": \"ok\"}\n```");
        let untagged = extract_record("```\n{\"Summary\": \"ok\"}\n```");
        assert_eq!(plain, fenced);
        assert_eq!(plain, untagged);
    }

    #[test]
    fn fenced_with_surrounding_whitespace() {
        let record = extract_record("  \n```json\n{\"Summary\": \"ok\"}\n```\n  ");
        assert_eq!(record["Summary"], "ok");
    }

    #[test]
    fn non_object_json_is_wrapped() {
        let record = extract_record(r#"["a", "b"]"#);
        assert_eq!(record.len(), 1);
        assert_eq!(record[RAW_RESPONSE_KEY], r#"["a","b"]"#);

        let record = extract_record("42");
        assert_eq!(record[RAW_RESPONSE_KEY], "42");
    }

    #[test]
    fn unparsable_text_keeps_the_original_untrimmed() {
        let raw = "  not json at all\n";
        let record = extract_record(raw);
        assert_eq!(record.len(), 1);
        assert_eq!(record[RAW_RESPONSE_KEY], raw);
    }

    #[test]
    fn empty_object_is_an_empty_record() {
        let record = extract_record("{}");
        assert!(record.is_empty());
    }

    #[test]
    fn never_fails_on_arbitrary_input() {
        for input in ["", "   ", "```\n```", "{\"broken\": ", "\u{0}\u{1}"] {
            let record = extract_record(input);
            // Any non-`{}` input yields at least the raw-response entry.
            assert!(record.len() >= 1, "empty record for {input:?}");
        }
    }

    #[test]
    fn non_string_values_are_coerced() {
        let record = extract_record(r#"{"Count": 3, "Flag": true, "Missing": null}"#);
        assert_eq!(record["Count"], "3");
        assert_eq!(record["Flag"], "true");
        assert_eq!(record["Missing"], "null");
    }
}
