//! Batch outcomes and their projection into export-ready records.
//!
//! One [`AnalysisOutcome`] per input document, in input order. The
//! projection flattens outcomes against the declared field order so the
//! export sink only ever sees complete string-to-string rows — a failed
//! document still contributes a row (identity field only), and its reason
//! string travels on the outcome for status displays.

use crate::error::DocumentError;
use crate::extract::FieldRecord;
use crate::fields::FieldSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The per-document result of running the analysis pipeline.
#[derive(Debug, Clone, Serialize)]
pub enum AnalysisOutcome {
    /// Extraction produced a field record.
    Success(FieldRecord),
    /// The document failed; the batch continued.
    Failure(DocumentError),
}

impl AnalysisOutcome {
    /// True for [`AnalysisOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    /// The extracted record, when there is one.
    pub fn record(&self) -> Option<&FieldRecord> {
        match self {
            AnalysisOutcome::Success(record) => Some(record),
            AnalysisOutcome::Failure(_) => None,
        }
    }

    /// Human-readable failure reason, when the document failed.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            AnalysisOutcome::Success(_) => None,
            AnalysisOutcome::Failure(e) => Some(e.to_string()),
        }
    }
}

/// A flat export row: every declared field name mapped to a string value.
pub type ExportRecord = HashMap<String, String>;

/// Aggregate counters for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Documents submitted.
    pub total_documents: usize,
    /// Documents whose outcome was a success record.
    pub succeeded: usize,
    /// Documents whose outcome was a failure.
    pub failed: usize,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

/// Everything a batch run produced, owned by the caller.
///
/// Replaces ambient session state: the runner fills one of these and hands
/// it back; reading results later needs no shared mutable globals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSession {
    /// Display filenames, in input order.
    pub filenames: Vec<String>,
    /// One outcome per filename, same order.
    pub outcomes: Vec<AnalysisOutcome>,
    /// Aggregate counters.
    pub stats: BatchStats,
}

impl BatchSession {
    /// Project the session into export-ready rows for the given fields.
    pub fn export_records(&self, fields: &FieldSpec) -> Vec<ExportRecord> {
        project_records(&self.outcomes, &self.filenames, fields)
    }

    /// Per-document `(filename, reason)` pairs for the failures.
    pub fn failures(&self) -> Vec<(&str, String)> {
        self.filenames
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(name, outcome)| {
                outcome.failure_reason().map(|reason| (name.as_str(), reason))
            })
            .collect()
    }
}

/// Reshape outcomes + filenames + declared field order into export rows.
///
/// * The identity field is always set from the filename.
/// * Success records contribute each declared non-identity field, with a
///   missing key silently defaulting to the empty string.
/// * Failure outcomes contribute no field values at all.
pub fn project_records(
    outcomes: &[AnalysisOutcome],
    filenames: &[String],
    fields: &FieldSpec,
) -> Vec<ExportRecord> {
    filenames
        .iter()
        .zip(outcomes)
        .map(|(filename, outcome)| {
            let mut row = ExportRecord::new();
            row.insert(fields.identity().to_string(), filename.clone());
            for field in fields.output_fields() {
                let value = outcome
                    .record()
                    .and_then(|r| r.get(field))
                    .cloned()
                    .unwrap_or_default();
                row.insert(field.clone(), value);
            }
            row
        })
        .collect()
}
