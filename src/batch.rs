//! Batch driver: one document at a time, in input order.
//!
//! The batch is sequential by contract — the pipeline's pacing delay is
//! the mechanism that respects the remote service's rate limit, and
//! concurrent pipelines would defeat it. The trade is simplicity: no
//! locks, no shared mutable state, and outcomes land in input order
//! without any sorting.
//!
//! One document's failure never stops the batch; the session always holds
//! exactly one outcome per input document.

use crate::config::AnalysisConfig;
use crate::document::Document;
use crate::error::DocumentError;
use crate::output::{AnalysisOutcome, BatchSession, BatchStats};
use crate::pipeline;
use crate::remote::InferenceService;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run the whole batch, returning a session with one outcome per document.
///
/// The compiled prompt is built once by the caller (see
/// [`crate::prompts::compile_prompt`]) and reused for every document.
/// Progress events fire through `config.progress_callback`; cancellation
/// via `config.cancel` converts the remaining documents into
/// [`DocumentError::Cancelled`] outcomes without dropping them.
pub async fn run_batch(
    service: &Arc<dyn InferenceService>,
    documents: &[Document],
    compiled_prompt: &str,
    config: &AnalysisConfig,
) -> BatchSession {
    let total = documents.len();
    let start = Instant::now();
    info!("Starting batch of {} documents", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut filenames = Vec::with_capacity(total);
    let mut outcomes = Vec::with_capacity(total);

    for (index, document) in documents.iter().enumerate() {
        let fraction = index as f64 / total as f64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &document.name, fraction);
        }

        let outcome = if config.cancel.is_cancelled() {
            warn!("Batch cancelled; skipping {}", document.name);
            AnalysisOutcome::Failure(DocumentError::Cancelled {
                name: document.name.clone(),
            })
        } else {
            pipeline::analyze_document(service, document, compiled_prompt, config).await
        };

        if let Some(ref cb) = config.progress_callback {
            match &outcome {
                AnalysisOutcome::Success(_) => {
                    cb.on_document_complete(index, total, &document.name)
                }
                AnalysisOutcome::Failure(e) => {
                    cb.on_document_error(index, total, &document.name, &e.to_string())
                }
            }
        }

        filenames.push(document.name.clone());
        outcomes.push(outcome);
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let stats = BatchStats {
        total_documents: total,
        succeeded,
        failed: total - succeeded,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} documents succeeded in {}ms",
        succeeded, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    BatchSession {
        filenames,
        outcomes,
        stats,
    }
}
