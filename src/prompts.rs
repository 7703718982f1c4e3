//! Prompt construction for structured document analysis.
//!
//! Centralising the prompt text here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON-output contract (exact keys,
//!    string values, the "N/A" sentinel) lives in exactly one place.
//!
//! 2. **Testability** — unit tests can inspect compiled prompts directly
//!    without calling a real model.
//!
//! The compiled prompt is built once per batch run, not per document.

use crate::fields::FieldSpec;

/// Default analysis prompt offered to users as a starting point.
pub const DEFAULT_ANALYSIS_PROMPT: &str = r#"Analyze this document and extract the following information with high accuracy.

Focus on:
- Key facts and data points
- Important dates and deadlines
- Named entities (people, organizations, locations)
- Document type and purpose

Be precise and only extract information that is explicitly stated in the document."#;

/// Merge the user's instruction with the field list into one prompt.
///
/// The identity field is never requested from the model — it is populated
/// from the filename. With no remaining fields the instruction is returned
/// unchanged and the analysis falls back to free-text capture.
///
/// Pure and deterministic: same inputs, same output.
pub fn compile_prompt(user_instruction: &str, fields: &FieldSpec) -> String {
    let output_fields = fields.output_fields();
    if output_fields.is_empty() {
        return user_instruction.to_string();
    }

    let key_list = output_fields
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"{user_instruction}

Based on your analysis, return your findings as a JSON object with exactly these keys: {key_list}

Each value should be a string. If information for a field is not found, use "N/A".

Return ONLY the JSON object, no additional text or markdown formatting."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_list_returns_instruction_unchanged() {
        let fields = FieldSpec::default();
        assert_eq!(compile_prompt("Summarize this.", &fields), "Summarize this.");
    }

    #[test]
    fn compiled_prompt_lists_every_output_field_verbatim() {
        let fields = FieldSpec::new(["Contract Type", "Effective Date", "Key Terms"]);
        let prompt = compile_prompt("Analyze the contract.", &fields);

        assert!(prompt.starts_with("Analyze the contract."));
        for field in fields.output_fields() {
            assert!(prompt.contains(&format!("\"{field}\"")), "missing {field}");
        }
        assert!(prompt.contains("\"N/A\""));
        assert!(prompt.contains("ONLY the JSON object"));
    }

    #[test]
    fn identity_field_is_not_requested() {
        let fields = FieldSpec::new(["Summary"]);
        let prompt = compile_prompt("Analyze.", &fields);
        assert!(!prompt.contains("\"Document Name\""));
    }

    #[test]
    fn compile_is_deterministic() {
        let fields = FieldSpec::new(["A", "B"]);
        assert_eq!(
            compile_prompt("X", &fields),
            compile_prompt("X", &fields)
        );
    }
}
