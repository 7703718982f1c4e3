//! Error types for the doc2table library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzerError`] — **Fatal**: the batch cannot start or finish at all
//!   (missing credential, bad input folder, unwritable output). Returned as
//!   `Err(AnalyzerError)` from setup and export functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (upload
//!   refused, generation errors exhausted their retries, unusable response)
//!   but the rest of the batch is fine. Stored inside
//!   [`crate::output::AnalysisOutcome`] so callers see partial success
//!   rather than losing the whole run to one bad document.
//!
//! Cleanup failures (releasing an uploaded file, removing staged content)
//! are in neither taxonomy: they are logged and swallowed inside the
//! pipeline and never override a document's primary outcome.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2table library.
///
/// Per-document failures use [`DocumentError`] and are stored in
/// [`crate::output::AnalysisOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// The API key environment variable is unset or empty.
    #[error("{var} is not set.\nExport it or add it to a .env file before running a batch.")]
    CredentialMissing { var: &'static str },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input folder was not found at the given path.
    #[error("Folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// The given path exists but is not a directory.
    #[error("Path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    DocumentReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Template errors ───────────────────────────────────────────────────
    /// A saved template could not be parsed.
    #[error("Error loading template: {detail}")]
    TemplateLoadFailed { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the spreadsheet output.
    #[error("Failed to write output file '{path}': {detail}")]
    ExportWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored inside [`crate::output::AnalysisOutcome::Failure`] when a
/// document fails. The batch continues regardless.
///
/// Every variant renders as `Error analyzing <name>: <cause>` so status
/// displays can show the reason string unmodified.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// Staging or uploading the document's bytes failed after retries.
    #[error("Error analyzing {name}: {detail}")]
    UploadFailed { name: String, detail: String },

    /// Content generation failed on every attempt.
    #[error("Error analyzing {name}: {detail} (after {attempts} attempts)")]
    GenerationFailed {
        name: String,
        attempts: u32,
        detail: String,
    },

    /// The service reply carried neither direct text nor text-bearing parts.
    #[error("Error analyzing {name}: unexpected response format from inference service")]
    MalformedResponse { name: String },

    /// The batch was cancelled before this document completed.
    #[error("Error analyzing {name}: cancelled")]
    Cancelled { name: String },
}

impl DocumentError {
    /// Display filename of the document this error belongs to.
    pub fn document_name(&self) -> &str {
        match self {
            DocumentError::UploadFailed { name, .. }
            | DocumentError::GenerationFailed { name, .. }
            | DocumentError::MalformedResponse { name }
            | DocumentError::Cancelled { name } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_missing_display() {
        let e = AnalyzerError::CredentialMissing {
            var: "GEMINI_API_KEY",
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn upload_failed_display() {
        let e = DocumentError::UploadFailed {
            name: "contract.pdf".into(),
            detail: "HTTP 403: quota exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Error analyzing contract.pdf:"), "got: {msg}");
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn generation_failed_display_includes_attempts() {
        let e = DocumentError::GenerationFailed {
            name: "a.pdf".into(),
            attempts: 3,
            detail: "HTTP 503: overloaded".into(),
        };
        assert!(e.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn document_name_accessor() {
        let e = DocumentError::MalformedResponse { name: "b.pdf".into() };
        assert_eq!(e.document_name(), "b.pdf");
    }
}
