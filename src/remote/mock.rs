//! Scripted in-memory [`InferenceService`] for deterministic tests.
//!
//! No network calls. Generation replies are consumed from a queue (front
//! first), falling back to a fixed default; upload and delete failures can
//! be injected per call. The mock also keeps a ledger of live handles —
//! uploads minus deletes — so tests can assert the pipeline's cleanup
//! post-condition: no leaked remote resource on any exit path.

use super::{InferenceService, RemoteHandle, ResponseContent, ServiceError};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic mock inference service.
///
/// ```
/// use doc2table::remote::mock::MockService;
///
/// let service = MockService::new(r#"{"Summary": "ok"}"#);
/// service.push_generate_error("HTTP 503: overloaded");
/// service.fail_next_uploads(1);
/// ```
#[derive(Debug, Default)]
pub struct MockService {
    default_response: String,
    generate_script: Mutex<VecDeque<Result<ResponseContent, String>>>,
    upload_script: Mutex<VecDeque<Result<(), String>>>,
    fail_deletes: AtomicBool,

    upload_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    next_handle_id: AtomicUsize,
    live: Mutex<HashSet<String>>,
}

impl MockService {
    /// Create a mock whose generations return `default_response` unless a
    /// scripted reply is queued.
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            default_response: default_response.into(),
            ..Self::default()
        }
    }

    /// Queue one direct-text reply.
    pub fn push_response(&self, text: impl Into<String>) {
        self.generate_script
            .lock()
            .unwrap()
            .push_back(Ok(ResponseContent::Direct(text.into())));
    }

    /// Queue one multi-part reply.
    pub fn push_parts<I, S>(&self, parts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generate_script.lock().unwrap().push_back(Ok(
            ResponseContent::Parts(parts.into_iter().map(Into::into).collect()),
        ));
    }

    /// Queue one generation failure with the given cause.
    pub fn push_generate_error(&self, message: impl Into<String>) {
        self.generate_script
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
    }

    /// Queue one malformed-format reply (neither text form present).
    pub fn push_malformed_response(&self) {
        self.generate_script
            .lock()
            .unwrap()
            .push_back(Err(String::new()));
    }

    /// Queue one successful upload (placeholder in a longer script).
    pub fn push_upload_ok(&self) {
        self.upload_script.lock().unwrap().push_back(Ok(()));
    }

    /// Queue one upload failure with the given cause.
    pub fn push_upload_error(&self, message: impl Into<String>) {
        self.upload_script
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
    }

    /// Make the next `n` upload calls fail before succeeding again.
    /// An exhausted script means success, so nothing needs to be queued
    /// for the recovery call.
    pub fn fail_next_uploads(&self, n: u32) {
        for _ in 0..n {
            self.push_upload_error("upload refused (injected)");
        }
    }

    /// Make every delete call fail (for cleanup-swallowing tests).
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of upload calls seen so far.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Number of generate calls seen so far.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls seen so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Handles uploaded but not yet deleted. Zero after a well-behaved
    /// pipeline run, whatever the outcome.
    pub fn live_handles(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

#[async_trait]
impl InferenceService for MockService {
    async fn upload(
        &self,
        _path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteHandle, ServiceError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(Err(message)) = self.upload_script.lock().unwrap().pop_front() {
            return Err(ServiceError::Other(format!(
                "{message} for {display_name}"
            )));
        }

        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        let name = format!("files/mock-{id}");
        self.live.lock().unwrap().insert(name.clone());
        Ok(RemoteHandle {
            uri: format!("mock://{name}"),
            name,
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate(
        &self,
        handle: &RemoteHandle,
        _prompt: &str,
    ) -> Result<ResponseContent, ServiceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);

        if !self.live.lock().unwrap().contains(&handle.name) {
            return Err(ServiceError::Other(format!(
                "unknown handle {} (deleted or never uploaded)",
                handle.name
            )));
        }

        match self.generate_script.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) if message.is_empty() => Err(ServiceError::MalformedResponse),
            Some(Err(message)) => Err(ServiceError::Other(message)),
            None => Ok(ResponseContent::Direct(self.default_response.clone())),
        }
    }

    async fn delete(&self, handle: &RemoteHandle) -> Result<(), ServiceError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ServiceError::Other("delete refused (injected)".into()));
        }

        self.live.lock().unwrap().remove(&handle.name);
        Ok(())
    }
}
