//! End-to-end batch tests over the scripted mock inference service.
//!
//! No network, no API key: the mock scripts every upload/generate/delete,
//! and tokio's paused clock makes the retry backoff and pacing sleeps
//! observable without real waiting.
//!
//! Run with:
//!   cargo test --test batch

use doc2table::{
    build_workbook, collect_documents, compile_prompt, project_records, run_batch,
    AnalysisConfig, AnalysisOutcome, Document, DocumentError, FieldSpec, InferenceService,
    MockService, Template,
};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn mock_pair(default_response: &str) -> (Arc<MockService>, Arc<dyn InferenceService>) {
    let mock = Arc::new(MockService::new(default_response));
    let service: Arc<dyn InferenceService> = mock.clone();
    (mock, service)
}

fn quick_config() -> AnalysisConfig {
    AnalysisConfig::builder()
        .api_delay_secs(0.0)
        .build()
        .unwrap()
}

fn docs(names: &[&str]) -> Vec<Document> {
    names
        .iter()
        .map(|n| Document::new(*n, format!("%PDF-1.4 {n}").into_bytes()))
        .collect()
}

// ── Scenario: fenced success + raw-response fallback in one batch ────────────

#[tokio::test(start_paused = true)]
async fn fenced_json_and_recovered_raw_response_batch() {
    let (mock, service) = mock_pair("unused");
    let fields = FieldSpec::new(["Summary"]);
    let prompt = compile_prompt("Analyze.", &fields);

    // Document A: fenced JSON reply.
    mock.push_upload_ok();
    mock.push_response("```json\n{\"Summary\": \"ok\"}\n```");
    // Document B: upload fails twice (within the retry bound of 2), then
    // generation answers something that is not JSON.
    mock.push_upload_error("HTTP 500: transient");
    mock.push_upload_error("HTTP 500: transient");
    mock.push_response("not json");

    let documents = docs(&["a.pdf", "b.pdf"]);
    let session = run_batch(&service, &documents, &prompt, &quick_config()).await;

    assert_eq!(session.outcomes.len(), 2);

    let record_a = session.outcomes[0].record().expect("A should succeed");
    assert_eq!(record_a.len(), 1);
    assert_eq!(record_a["Summary"], "ok");

    let record_b = session.outcomes[1].record().expect("B should succeed");
    assert_eq!(record_b.len(), 1);
    assert_eq!(record_b["Raw Response"], "not json");

    // Cleanup post-condition: nothing staged or uploaded survives the batch.
    assert_eq!(mock.live_handles(), 0);
    assert_eq!(mock.delete_calls(), 2);
}

// ── Scenario: retry timing on the paused clock ───────────────────────────────

#[tokio::test(start_paused = true)]
async fn generation_backoff_waits_two_then_four_seconds() {
    let (mock, service) = mock_pair(r#"{"Summary": "ok"}"#);
    mock.push_generate_error("HTTP 503: attempt 0");
    mock.push_generate_error("HTTP 503: attempt 1");
    // Third attempt falls through to the default response.

    let config = quick_config(); // max_retries = 2 by default
    let started = tokio::time::Instant::now();
    let documents = docs(&["a.pdf"]);
    let session = run_batch(&service, &documents, "prompt", &config).await;

    assert!(session.outcomes[0].is_success());
    assert_eq!(mock.generate_calls(), 3);
    // Waits of (0+1)*2 and (1+1)*2 seconds, nothing before the first attempt.
    assert_eq!(started.elapsed(), std::time::Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn pacing_applies_after_successes_only() {
    let (mock, service) = mock_pair(r#"{"Summary": "ok"}"#);
    // Second document fails generation outright (no retries configured).
    mock.push_response(r#"{"Summary": "first"}"#);
    mock.push_generate_error("HTTP 400: bad request");

    let config = AnalysisConfig::builder()
        .api_delay_secs(1.0)
        .max_retries(0)
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let session = run_batch(&service, &docs(&["a.pdf", "b.pdf"]), "prompt", &config).await;

    assert!(session.outcomes[0].is_success());
    assert!(!session.outcomes[1].is_success());
    // One second of pacing for the success; the failure adds none.
    assert_eq!(started.elapsed(), std::time::Duration::from_secs(1));
}

// ── Ordering and isolation ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn every_document_gets_an_outcome_in_input_order() {
    let (mock, service) = mock_pair("unused");
    let names = ["one.pdf", "two.pdf", "three.pdf", "four.pdf"];

    // one: success; two: upload exhausted; three: malformed; four: success.
    // Upload script: one succeeds, then two burns all three attempts; the
    // exhausted script lets three and four upload normally.
    mock.push_upload_ok();
    for _ in 0..3 {
        mock.push_upload_error("HTTP 502: bad gateway");
    }
    // Generation script: one reply for one, three malformed attempts for
    // three, one reply for four. Two never reaches generation.
    mock.push_response(r#"{"Summary": "1"}"#);
    for _ in 0..3 {
        mock.push_malformed_response();
    }
    mock.push_response(r#"{"Summary": "4"}"#);

    let session = run_batch(&service, &docs(&names), "prompt", &quick_config()).await;

    assert_eq!(session.filenames, names);
    assert_eq!(session.outcomes.len(), 4);
    assert!(session.outcomes[0].is_success());
    assert!(matches!(
        session.outcomes[1],
        AnalysisOutcome::Failure(DocumentError::UploadFailed { .. })
    ));
    assert!(matches!(
        session.outcomes[2],
        AnalysisOutcome::Failure(DocumentError::MalformedResponse { .. })
    ));
    assert!(session.outcomes[3].is_success());

    assert_eq!(session.stats.succeeded, 2);
    assert_eq!(session.stats.failed, 2);
    assert_eq!(mock.live_handles(), 0);
}

#[tokio::test]
async fn failure_reasons_are_human_readable() {
    let (mock, service) = mock_pair("unused");
    mock.push_upload_error("HTTP 403: permission denied");
    let config = AnalysisConfig::builder()
        .api_delay_secs(0.0)
        .max_retries(0)
        .build()
        .unwrap();

    let session = run_batch(&service, &docs(&["secret.pdf"]), "prompt", &config).await;
    let failures = session.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.starts_with("Error analyzing secret.pdf:"));
    assert!(failures[0].1.contains("permission denied"));
}

// ── Projection and export ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_documents_still_get_export_rows() {
    let (mock, service) = mock_pair("unused");
    let fields = FieldSpec::new(["Summary", "Amount"]);
    let prompt = compile_prompt("Analyze.", &fields);

    mock.push_response(r#"{"Summary": "ok"}"#); // Amount missing on purpose
    for _ in 0..3 {
        mock.push_generate_error("HTTP 500");
    }

    let documents = docs(&["good.pdf", "bad.pdf"]);
    let session = run_batch(&service, &documents, &prompt, &quick_config()).await;

    let records = project_records(&session.outcomes, &session.filenames, &fields);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["Document Name"], "good.pdf");
    assert_eq!(records[0]["Summary"], "ok");
    assert_eq!(records[0]["Amount"], ""); // missing key tolerated silently

    assert_eq!(records[1]["Document Name"], "bad.pdf");
    assert_eq!(records[1]["Summary"], "");
    assert_eq!(records[1]["Amount"], "");

    // Export runs even for the partially failed batch.
    let workbook = build_workbook(&records, &fields).unwrap();
    assert_eq!(&workbook[..2], b"PK");
}

// ── Template round-trip ──────────────────────────────────────────────────────

#[test]
fn template_round_trip_reproduces_prompt_and_fields() {
    let original = r#"{"prompt": "X", "columns": ["A", "B"]}"#;
    let loaded = Template::from_json(original).unwrap();
    let fields = loaded.field_spec();
    assert_eq!(fields.names(), &["Document Name", "A", "B"]);

    // Re-capture without adding columns; the JSON content is equivalent.
    let saved = Template::capture(&loaded.prompt, &fields);
    assert_eq!(saved, loaded);
    let reloaded = Template::from_json(&saved.to_json()).unwrap();
    assert_eq!(reloaded, loaded);
}

// ── Folder collection through the batch ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn collected_folder_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.pdf"), b"%PDF-1.4 x").unwrap();
    std::fs::write(dir.path().join("y.pdf"), b"%PDF-1.4 y").unwrap();
    std::fs::write(dir.path().join("skip.txt"), b"ignored").unwrap();

    let documents = collect_documents(dir.path()).unwrap();
    assert_eq!(documents.len(), 2);

    let (mock, service) = mock_pair(r#"{"Summary": "ok"}"#);
    let session = run_batch(&service, &documents, "prompt", &quick_config()).await;

    assert_eq!(session.outcomes.len(), 2);
    assert!(session.outcomes.iter().all(|o| o.is_success()));
    assert_eq!(mock.upload_calls(), 2);
    assert_eq!(mock.live_handles(), 0);
}
