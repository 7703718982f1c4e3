//! Per-document analysis: stage → upload → generate → extract → cleanup.
//!
//! ## Retry Strategy
//!
//! Remote calls fail transiently (overloaded backend, quota blips), so the
//! upload and generation calls each get up to `max_retries` additional
//! attempts. After failed attempt *i* (0-indexed) the pipeline waits
//! `(i + 1) * 2` seconds before the next attempt — nothing is waited before
//! the first. The last failure becomes the document's visible reason.
//!
//! ## Cleanup Guarantee
//!
//! Staged bytes and the uploaded server-side copy are both released on
//! every exit path — success, upload failure, generation failure,
//! malformed response, cancellation. Cleanup errors are logged and
//! swallowed; they never mask the document's primary outcome.

use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::document::Document;
use crate::error::DocumentError;
use crate::extract::extract_record;
use crate::output::AnalysisOutcome;
use crate::remote::{InferenceService, RemoteHandle, ServiceError};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Delay inserted after failed attempt `failed_attempt` (0-indexed).
fn backoff_delay(failed_attempt: u32) -> Duration {
    Duration::from_secs(u64::from(failed_attempt + 1) * 2)
}

/// A document's bytes written to a private temp file, solely to satisfy
/// the upload contract. Unique per invocation, never shared, removed
/// explicitly once the server-side copy no longer needs it.
struct StagedContent {
    file: NamedTempFile,
}

impl StagedContent {
    fn stage(document: &Document) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("doc2table-")
            .suffix(&document.staging_suffix())
            .tempfile()?;
        file.write_all(&document.bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }

    fn remove(self) -> std::io::Result<()> {
        self.file.close()
    }
}

/// Run `op` up to `max_retries + 1` times with the fixed backoff schedule.
///
/// Cancellation is honoured between attempts (after the backoff sleep,
/// before the call); an in-flight call is never interrupted here.
async fn with_retry<T, F, Fut>(
    what: &str,
    name: &str,
    max_retries: u32,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt - 1);
            warn!(
                "{}: {} retry {}/{} after {}s",
                name,
                what,
                attempt,
                max_retries,
                delay.as_secs()
            );
            sleep(delay).await;
        }

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{}: {} attempt {} failed — {}", name, what, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ServiceError::Other("Unknown error".to_string())))
}

/// Release the server-side copy and the staged bytes.
///
/// Failures are logged at debug level and dropped — by the time cleanup
/// runs the document already has its outcome.
async fn release(
    service: &dyn InferenceService,
    handle: Option<&RemoteHandle>,
    staged: Option<StagedContent>,
    name: &str,
) {
    if let Some(handle) = handle {
        if let Err(e) = service.delete(handle).await {
            debug!("{}: ignoring remote cleanup failure for {}: {}", name, handle.name, e);
        }
    }
    if let Some(staged) = staged {
        if let Err(e) = staged.remove() {
            debug!("{}: ignoring staged-content cleanup failure: {}", name, e);
        }
    }
}

/// Analyze one document through the full pipeline.
///
/// Always returns an outcome — errors are converted at this boundary so a
/// single bad document never aborts the batch. On success the configured
/// pacing delay is applied before returning, preserving rate-limit
/// etiquette between successful calls; failure paths already paid their
/// retry backoff and are not slowed further.
pub async fn analyze_document(
    service: &Arc<dyn InferenceService>,
    document: &Document,
    prompt: &str,
    config: &AnalysisConfig,
) -> AnalysisOutcome {
    let name = &document.name;

    // ── Step 1: Stage bytes for upload ───────────────────────────────────
    let staged = match StagedContent::stage(document) {
        Ok(staged) => staged,
        Err(e) => {
            return AnalysisOutcome::Failure(DocumentError::UploadFailed {
                name: name.clone(),
                detail: format!("could not stage content: {e}"),
            });
        }
    };

    // ── Step 2: Upload ───────────────────────────────────────────────────
    let mime = document.mime_type();
    let uploaded = with_retry("upload", name, config.max_retries, &config.cancel, || {
        service.upload(staged.path(), name, mime)
    })
    .await;

    let handle = match uploaded {
        Ok(handle) => handle,
        Err(e) => {
            release(service.as_ref(), None, Some(staged), name).await;
            let failure = match e {
                ServiceError::Cancelled => DocumentError::Cancelled { name: name.clone() },
                other => DocumentError::UploadFailed {
                    name: name.clone(),
                    detail: other.to_string(),
                },
            };
            return AnalysisOutcome::Failure(failure);
        }
    };

    // ── Steps 3–5: Generate, then extract ────────────────────────────────
    let generated = with_retry("generation", name, config.max_retries, &config.cancel, || {
        service.generate(&handle, prompt)
    })
    .await;

    let outcome = match generated {
        Ok(content) => AnalysisOutcome::Success(extract_record(&content.into_text())),
        Err(ServiceError::Cancelled) => {
            AnalysisOutcome::Failure(DocumentError::Cancelled { name: name.clone() })
        }
        Err(ServiceError::MalformedResponse) => {
            AnalysisOutcome::Failure(DocumentError::MalformedResponse { name: name.clone() })
        }
        Err(other) => AnalysisOutcome::Failure(DocumentError::GenerationFailed {
            name: name.clone(),
            attempts: config.max_retries + 1,
            detail: other.to_string(),
        }),
    };

    // ── Step 6: Cleanup, all paths ───────────────────────────────────────
    release(service.as_ref(), Some(&handle), Some(staged), name).await;

    // ── Step 7: Pacing, success only ─────────────────────────────────────
    if outcome.is_success() && config.api_delay_secs > 0.0 {
        sleep(Duration::from_secs_f64(config.api_delay_secs)).await;
    }

    outcome
}
