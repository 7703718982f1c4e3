//! Google Gemini implementation of [`InferenceService`].
//!
//! Three REST calls back the three trait verbs:
//!
//! * `POST /upload/v1beta/files?uploadType=media` — raw media upload of the
//!   staged bytes, returning a `File` resource.
//! * `POST /v1beta/models/{model}:generateContent` — one `file_data` part
//!   referencing the upload plus one `text` part with the compiled prompt.
//! * `DELETE /v1beta/{name}` — release the server-side copy.
//!
//! No retry happens here; the pipeline owns the retry/backoff schedule so
//! the mock and the real client behave identically under test.

use super::{InferenceService, RemoteHandle, ResponseContent, ServiceError};
use crate::error::AnalyzerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default per-call HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini Files API + generateContent client.
#[derive(Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with the given key and model and the default
    /// per-call timeout.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, AnalyzerError> {
        Self::with_timeout(api_key, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with an explicit per-call timeout.
    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AnalyzerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Read the API key from [`API_KEY_VAR`].
    ///
    /// Absence is the fatal pre-batch condition: callers must surface it to
    /// the operator before any document is processed.
    pub fn from_env(model: impl Into<String>) -> Result<Self, AnalyzerError> {
        Self::from_env_with_timeout(model, DEFAULT_TIMEOUT_SECS)
    }

    /// [`from_env`](Self::from_env) with an explicit per-call timeout.
    pub fn from_env_with_timeout(
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AnalyzerError> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.is_empty() => Self::with_timeout(key, model, timeout_secs),
            _ => Err(AnalyzerError::CredentialMissing { var: API_KEY_VAR }),
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model identifier this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check the status and decode the JSON body, surfacing error bodies
    /// as [`ServiceError::Api`].
    async fn expect_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: summarize_api_error(&message),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// Prefer the API's own error message over a raw JSON body dump.
fn summarize_api_error(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.len() > 200 {
                let mut end = 200;
                while !trimmed.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}…", &trimmed[..end])
            } else {
                trimmed.to_string()
            }
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    mime_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Map the wire shape into the closed [`ResponseContent`] variants.
    fn into_content(self) -> Result<ResponseContent, ServiceError> {
        let mut texts: Vec<String> = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        match texts.len() {
            0 => Err(ServiceError::MalformedResponse),
            1 => Ok(ResponseContent::Direct(texts.remove(0))),
            _ => Ok(ResponseContent::Parts(texts)),
        }
    }
}

#[async_trait]
impl InferenceService for GeminiClient {
    async fn upload(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteHandle, ServiceError> {
        let bytes = tokio::fs::read(path).await?;
        debug!(
            "Uploading {} ({} bytes, {})",
            display_name,
            bytes.len(),
            mime_type
        );

        let url = format!("{}/upload/v1beta/files?uploadType=media", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .header("X-Goog-Upload-Protocol", "raw")
            .body(bytes)
            .send()
            .await?;

        let uploaded: UploadResponse = Self::expect_json(response).await?;
        let name = uploaded.file.name;
        let uri = uploaded
            .file
            .uri
            .unwrap_or_else(|| format!("{}/v1beta/{}", self.base_url, name));
        debug!("Uploaded {} as {}", display_name, name);

        Ok(RemoteHandle {
            name,
            uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn generate(
        &self,
        handle: &RemoteHandle,
        prompt: &str,
    ) -> Result<ResponseContent, ServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::File {
                        file_data: FileData {
                            file_uri: handle.uri.clone(),
                            mime_type: handle.mime_type.clone(),
                        },
                    },
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let decoded: GenerateResponse = Self::expect_json(response).await?;
        decoded.into_content()
    }

    async fn delete(&self, handle: &RemoteHandle) -> Result<(), ServiceError> {
        let url = format!("{}/v1beta/{}", self.base_url, handle.name);
        let response = self
            .http
            .delete(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: summarize_api_error(&message),
            });
        }
        debug!("Deleted {}", handle.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn single_part_maps_to_direct() {
        let response = decode(
            r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#,
        );
        assert_eq!(
            response.into_content().unwrap(),
            ResponseContent::Direct("hello".into())
        );
    }

    #[test]
    fn multiple_parts_map_to_parts_in_order() {
        let response = decode(
            r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]}"#,
        );
        assert_eq!(
            response.into_content().unwrap(),
            ResponseContent::Parts(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn missing_text_is_malformed() {
        for body in [
            r#"{}"#,
            r#"{"candidates": []}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {}}]}}]}"#,
        ] {
            let err = decode(body).into_content().unwrap_err();
            assert!(
                matches!(err, ServiceError::MalformedResponse),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn api_error_body_is_summarized() {
        let body = r#"{"error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(summarize_api_error(body), "Resource exhausted");
        assert_eq!(summarize_api_error("plain failure"), "plain failure");
    }

    #[test]
    fn generate_request_wire_shape() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::File {
                        file_data: FileData {
                            file_uri: "uri".into(),
                            mime_type: "application/pdf".into(),
                        },
                    },
                    RequestPart::Text {
                        text: "prompt".into(),
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["fileData"]["fileUri"], "uri");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "prompt");
    }

    #[test]
    fn from_env_without_key_is_credential_missing() {
        // Serialise around the env var to avoid cross-test interference.
        let prev = std::env::var(API_KEY_VAR).ok();
        std::env::remove_var(API_KEY_VAR);
        let err = GeminiClient::from_env(DEFAULT_MODEL).unwrap_err();
        assert!(matches!(err, AnalyzerError::CredentialMissing { .. }));
        if let Some(v) = prev {
            std::env::set_var(API_KEY_VAR, v);
        }
    }
}
