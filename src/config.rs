//! Configuration types for batch document analysis.
//!
//! All batch behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across a run, log it, and diff two runs to
//! understand why their outputs differ.

use crate::cancel::CancelToken;
use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for one batch analysis run.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2table::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-2.5-flash")
///     .max_retries(3)
///     .api_delay_secs(0.5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier sent to the inference service. Default:
    /// `gemini-3-pro-preview`.
    pub model: String,

    /// Maximum retry attempts *after* the first failed call. Default: 2.
    ///
    /// Applies to the upload and generation calls of each document; a
    /// document is attempted at most `max_retries + 1` times per call site.
    pub max_retries: u32,

    /// Pacing delay in seconds inserted after each successful document.
    /// Default: 1.0.
    ///
    /// This fixed sleep is the rate-limit mechanism: the batch is
    /// sequential by contract, so spacing successful calls keeps the run
    /// under the service quota. Failed documents are not slowed further —
    /// they already paid their retry backoff.
    pub api_delay_secs: f64,

    /// Per-HTTP-call timeout in seconds. Default: 120.
    ///
    /// Bounds a single attempt, not the retry schedule.
    pub api_timeout_secs: u64,

    /// Progress sink for batch events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Cancellation flag checked between documents and between retry
    /// attempts. Default: a token nobody cancels.
    pub cancel: CancelToken,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: crate::remote::gemini::DEFAULT_MODEL.to_string(),
            max_retries: 2,
            api_delay_secs: 1.0,
            api_timeout_secs: crate::remote::gemini::DEFAULT_TIMEOUT_SECS,
            progress_callback: None,
            cancel: CancelToken::new(),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("api_delay_secs", &self.api_delay_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn api_delay_secs(mut self, secs: f64) -> Self {
        self.config.api_delay_secs = secs.max(0.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzerError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if !c.api_delay_secs.is_finite() {
            return Err(AnalyzerError::InvalidConfig(format!(
                "API delay must be finite, got {}",
                c.api_delay_secs
            )));
        }
        Ok(self.config)
    }
}
