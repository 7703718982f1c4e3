//! Output field definitions and the saved-template interchange format.
//!
//! A batch run is described by an ordered list of output fields. The first
//! field is always [`IDENTITY_FIELD`]: it is populated from each document's
//! filename rather than requested from the model, so it is filtered out of
//! the compiled prompt and protected from removal here.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};

/// Name of the reserved first field, auto-populated with the filename.
pub const IDENTITY_FIELD: &str = "Document Name";

/// Ordered, de-duplicated set of output field names.
///
/// Invariants maintained by every constructor and mutator:
/// * [`IDENTITY_FIELD`] is present and first.
/// * No two fields share a name (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    names: Vec<String>,
}

impl FieldSpec {
    /// Build a spec from the non-identity columns, in order.
    ///
    /// The identity field is prepended implicitly; duplicates and any
    /// column spelled like the identity field are dropped.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self {
            names: vec![IDENTITY_FIELD.to_string()],
        };
        for col in columns {
            spec.add_column(col.into());
        }
        spec
    }

    /// All field names, identity field first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The reserved identity field name.
    pub fn identity(&self) -> &str {
        &self.names[0]
    }

    /// The fields actually requested from the model (identity excluded).
    pub fn output_fields(&self) -> &[String] {
        &self.names[1..]
    }

    /// Number of fields, identity included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when only the identity field is declared.
    pub fn is_empty(&self) -> bool {
        self.names.len() == 1
    }

    /// Append a column. Returns `false` when the name is blank, duplicates
    /// an existing field, or collides with the identity field.
    pub fn add_column(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self
            .names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(trimmed))
        {
            return false;
        }
        self.names.push(trimmed.to_string());
        true
    }

    /// Remove a column by name. The identity field is never removed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        if name.eq_ignore_ascii_case(IDENTITY_FIELD) {
            return false;
        }
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

/// Saved analysis configuration: the prompt plus the non-identity columns.
///
/// Round-trips through JSON as `{"prompt": ..., "columns": [...]}` so
/// templates written by earlier versions (and by the configuration surface)
/// load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub prompt: String,
    pub columns: Vec<String>,
}

impl Template {
    /// Capture the current prompt and field spec as a template.
    pub fn capture(prompt: impl Into<String>, fields: &FieldSpec) -> Self {
        Self {
            prompt: prompt.into(),
            columns: fields.output_fields().to_vec(),
        }
    }

    /// Parse a template from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        serde_json::from_str(json).map_err(|e| AnalyzerError::TemplateLoadFailed {
            detail: e.to_string(),
        })
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        // Template is a plain string/list struct; serialisation cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Rebuild the field spec this template describes.
    pub fn field_spec(&self) -> FieldSpec {
        FieldSpec::new(self.columns.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_field_is_always_first() {
        let spec = FieldSpec::new(["Summary", "Date"]);
        assert_eq!(spec.names(), &["Document Name", "Summary", "Date"]);
        assert_eq!(spec.identity(), IDENTITY_FIELD);
    }

    #[test]
    fn duplicates_are_dropped_case_insensitively() {
        let spec = FieldSpec::new(["Summary", "summary", "SUMMARY", "Date"]);
        assert_eq!(spec.names(), &["Document Name", "Summary", "Date"]);
    }

    #[test]
    fn identity_cannot_be_added_twice_or_removed() {
        let mut spec = FieldSpec::new(["document name", "Summary"]);
        assert_eq!(spec.output_fields(), &["Summary"]);
        assert!(!spec.remove_column("Document Name"));
        assert!(spec.remove_column("Summary"));
        assert!(spec.is_empty());
    }

    #[test]
    fn blank_columns_are_rejected() {
        let mut spec = FieldSpec::default();
        assert!(!spec.add_column("   "));
        assert!(spec.add_column("  Amount  "));
        assert_eq!(spec.output_fields(), &["Amount"]);
    }

    #[test]
    fn template_round_trip() {
        let json = r#"{"prompt": "X", "columns": ["A", "B"]}"#;
        let template = Template::from_json(json).unwrap();
        assert_eq!(template.prompt, "X");
        assert_eq!(template.columns, vec!["A", "B"]);

        let reparsed = Template::from_json(&template.to_json()).unwrap();
        assert_eq!(reparsed, template);
    }

    #[test]
    fn template_capture_excludes_identity() {
        let spec = FieldSpec::new(["A", "B"]);
        let template = Template::capture("X", &spec);
        assert_eq!(template.columns, vec!["A", "B"]);
        assert_eq!(template.field_spec(), spec);
    }

    #[test]
    fn template_load_failure_is_fatal_variant() {
        let err = Template::from_json("not json").unwrap_err();
        assert!(matches!(err, AnalyzerError::TemplateLoadFailed { .. }));
        assert!(err.to_string().starts_with("Error loading template:"));
    }
}
