//! # doc2table
//!
//! Batch-analyze documents with multimodal LLMs and export user-defined
//! structured fields to a spreadsheet.
//!
//! ## Why this crate?
//!
//! Pulling the same handful of facts ("Contract Type", "Effective Date",
//! "Key Terms", …) out of a folder of PDFs is tedious by hand and brittle
//! with classic text extraction. Instead this crate uploads each document
//! to a multimodal inference service, asks for a JSON object with exactly
//! the fields you declared, defensively parses whatever comes back, and
//! assembles the batch into one export-ready table — one row per document,
//! failures included.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents
//!  │
//!  ├─ 1. Compile  user prompt + field list → one instruction (per batch)
//!  ├─ 2. Stage    bytes → private temp file (per document)
//!  ├─ 3. Upload   temp file → remote handle
//!  ├─ 4. Generate inference with bounded retry/backoff
//!  ├─ 5. Extract  fence-tolerant JSON → field record
//!  ├─ 6. Cleanup  delete remote handle + staged file, every path
//!  └─ 7. Export   outcomes + field order → styled XLSX
//! ```
//!
//! Documents are processed strictly in order, one at a time, with a pacing
//! delay after each success — the sequential batch *is* the rate-limit
//! mechanism. One document's failure never aborts the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2table::{
//!     collect_documents, compile_prompt, export_to_file, run_batch,
//!     AnalysisConfig, FieldSpec, GeminiClient, InferenceService,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fields = FieldSpec::new(["Contract Type", "Effective Date"]);
//!     let prompt = compile_prompt("Analyze this contract.", &fields);
//!
//!     let config = AnalysisConfig::default();
//!     let service: Arc<dyn InferenceService> =
//!         Arc::new(GeminiClient::from_env(&config.model)?);
//!
//!     let documents = collect_documents("./contracts")?;
//!     let session = run_batch(&service, &documents, &prompt, &config).await;
//!
//!     export_to_file("results.xlsx", &session.export_records(&fields), &fields)?;
//!     eprintln!("{}/{} documents succeeded", session.stats.succeeded, session.stats.total_documents);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2table` binary (clap + anyhow + indicatif + tracing-subscriber + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2table = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod cancel;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod remote;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::run_batch;
pub use cancel::CancelToken;
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use document::{collect_documents, Document};
pub use error::{AnalyzerError, DocumentError};
pub use export::{build_workbook, export_to_file};
pub use extract::{extract_record, FieldRecord, RAW_RESPONSE_KEY};
pub use fields::{FieldSpec, Template, IDENTITY_FIELD};
pub use output::{project_records, AnalysisOutcome, BatchSession, BatchStats, ExportRecord};
pub use pipeline::analyze_document;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{compile_prompt, DEFAULT_ANALYSIS_PROMPT};
pub use remote::gemini::GeminiClient;
pub use remote::mock::MockService;
pub use remote::{InferenceService, RemoteHandle, ResponseContent, ServiceError};
