//! The remote inference capability consumed by the analysis pipeline.
//!
//! The pipeline only knows three verbs — upload content, generate against
//! it, delete it — expressed as the [`InferenceService`] trait. Keeping the
//! seam this narrow means the pipeline, batch runner, and tests never touch
//! wire formats: [`gemini::GeminiClient`] speaks the real REST API, while
//! [`mock::MockService`] scripts outcomes for tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Opaque reference to content staged server-side by an upload.
///
/// Owned exclusively by the pipeline invocation that created it and must be
/// released through [`InferenceService::delete`] before that invocation
/// ends, on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle {
    /// Server-side resource name, e.g. `files/abc123`.
    pub name: String,
    /// URI referenced from generation requests.
    pub uri: String,
    /// MIME type the content was uploaded with.
    pub mime_type: String,
}

/// Text content of a generation reply.
///
/// Services expose the reply either as one direct text blob or as an
/// ordered sequence of text-bearing parts; the integration layer maps the
/// wire shape into exactly one of these. A reply with neither form is a
/// [`ServiceError::MalformedResponse`] at that layer, never a third
/// variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseContent {
    /// The reply text, directly.
    Direct(String),
    /// Text parts to be concatenated in order.
    Parts(Vec<String>),
}

impl ResponseContent {
    /// Flatten to the reply text.
    pub fn into_text(self) -> String {
        match self {
            ResponseContent::Direct(text) => text,
            ResponseContent::Parts(parts) => parts.concat(),
        }
    }
}

/// Errors surfaced by an inference service implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network-level failure (connect, timeout, TLS, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading staged content from disk failed.
    #[error("failed to read staged content: {0}")]
    Staging(#[from] std::io::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The reply carried neither direct text nor text-bearing parts.
    #[error("unexpected response format from inference service")]
    MalformedResponse,

    /// The operation was abandoned because the batch was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// Implementation-specific failure with a descriptive cause.
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// True for the cancellation marker, which maps to its own
    /// document-level failure rather than a retry exhaustion message.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}

/// The remote multimodal inference capability.
///
/// Implementations must be `Send + Sync`; the trait object is shared
/// behind an `Arc` across the batch run.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Upload staged content, returning a handle to the server-side copy.
    async fn upload(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteHandle, ServiceError>;

    /// Run one generation against previously uploaded content.
    async fn generate(
        &self,
        handle: &RemoteHandle,
        prompt: &str,
    ) -> Result<ResponseContent, ServiceError>;

    /// Release the server-side copy. Idempotency is not assumed; the
    /// pipeline calls this exactly once per successful upload.
    async fn delete(&self, handle: &RemoteHandle) -> Result<(), ServiceError>;
}
