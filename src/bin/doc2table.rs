//! CLI binary for doc2table.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, drives the batch, and writes the spreadsheet.

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc2table::{
    collect_documents, compile_prompt, export_to_file, run_batch, AnalysisConfig,
    BatchProgressCallback, CancelToken, Document, FieldSpec, GeminiClient, InferenceService,
    ProgressCallback, Template, DEFAULT_ANALYSIS_PROMPT,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus a ✓/✗ log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting analysis of {total} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str, _fraction: f64) {
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str) {
        self.bar
            .println(format!("  {} {:>3}/{:<3}  {}", green("✓"), index + 1, total, name));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        // Truncate very long reasons to keep output tidy.
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents analyzed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents analyzed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a folder of PDFs into results.xlsx
  doc2table ./contracts --columns "Contract Type,Effective Date,Key Terms" -o results.xlsx

  # Custom instruction from a file, specific documents
  doc2table a.pdf b.pdf --columns Summary --prompt-file instructions.txt

  # Reuse a saved template
  doc2table ./invoices --template invoice_template.json -o invoices.xlsx

  # Save the current configuration as a template (no analysis)
  doc2table --columns "Vendor,Amount,Due Date" --save-template invoice_template.json

  # Machine-readable outcomes on stdout
  doc2table ./contracts --columns Summary --json > outcomes.json

TEMPLATE FORMAT:
  {"prompt": "<analysis instruction>", "columns": ["<field>", ...]}
  The "Document Name" column is implicit: it is always first and is filled
  from each file's name, never requested from the model.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          API key (required; .env files are honoured)
  DOC2TABLE_MODEL         Override the model ID
  DOC2TABLE_API_DELAY     Pacing delay between successful calls, seconds
  DOC2TABLE_MAX_RETRIES   Retries after a failed remote call
"#;

/// Batch-analyze documents with Gemini and export structured fields to XLSX.
#[derive(Parser, Debug)]
#[command(
    name = "doc2table",
    version,
    about = "Batch-analyze documents with multimodal LLMs and export structured fields to a spreadsheet",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document files and/or folders (folders are scanned recursively for PDFs).
    inputs: Vec<String>,

    /// Write the spreadsheet to this file.
    #[arg(short, long, env = "DOC2TABLE_OUTPUT", default_value = "analysis_results.xlsx")]
    output: PathBuf,

    /// Output columns, comma-separated or repeated.
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Analysis instruction sent with every document.
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the analysis instruction from a text file.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Load prompt and columns from a saved template JSON file.
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Save the resolved prompt and columns as a template JSON file.
    #[arg(long)]
    save_template: Option<PathBuf>,

    /// Model identifier.
    #[arg(long, env = "DOC2TABLE_MODEL", default_value = "gemini-3-pro-preview")]
    model: String,

    /// Delay in seconds after each successful call, to respect rate limits.
    #[arg(long, env = "DOC2TABLE_API_DELAY", default_value_t = 1.0)]
    api_delay: f64,

    /// Retries after a failed remote call.
    #[arg(long, env = "DOC2TABLE_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call HTTP timeout in seconds.
    #[arg(long, env = "DOC2TABLE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print outcomes as JSON to stdout instead of writing a spreadsheet.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "DOC2TABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2TABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2TABLE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first, so clap env fallbacks and the API key both see it.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve prompt and columns ───────────────────────────────────────
    let (prompt_text, fields) = resolve_prompt_and_fields(&cli)?;

    if let Some(ref path) = cli.save_template {
        let template = Template::capture(&prompt_text, &fields);
        std::fs::write(path, template.to_json())
            .with_context(|| format!("Failed to write template to {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{} Template saved to {}", green("✔"), bold(&path.display().to_string()));
        }
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    if cli.inputs.is_empty() {
        bail!("No documents given. Pass files or folders to analyze.");
    }
    if fields.is_empty() {
        bail!(
            "No output columns defined. Add at least one with --columns or a template \
             (\"Document Name\" is implicit)."
        );
    }

    // ── Collect documents ────────────────────────────────────────────────
    let documents = collect_inputs(&cli.inputs)?;
    if documents.is_empty() {
        bail!("No documents found in the given inputs.");
    }

    // ── Build the client and config ──────────────────────────────────────
    let service: Arc<dyn InferenceService> =
        Arc::new(GeminiClient::from_env_with_timeout(&cli.model, cli.api_timeout)?);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling after the current document…");
                cancel.cancel();
            }
        });
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let mut builder = AnalysisConfig::builder()
        .model(&cli.model)
        .max_retries(cli.max_retries)
        .api_delay_secs(cli.api_delay)
        .api_timeout_secs(cli.api_timeout)
        .cancel_token(cancel);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run the batch ────────────────────────────────────────────────────
    let compiled = compile_prompt(&prompt_text, &fields);
    let session = run_batch(&service, &documents, &compiled, &config).await;

    // ── Emit results ─────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&session).context("Failed to serialise outcomes")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(json.as_bytes()).context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    } else {
        let records = session.export_records(&fields);
        export_to_file(&cli.output, &records, &fields)?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} documents  →  {}",
                if session.stats.failed == 0 { green("✔") } else { cyan("⚠") },
                session.stats.succeeded,
                session.stats.total_documents,
                bold(&cli.output.display().to_string()),
            );
            eprintln!("   {}", dim(&format!("{}ms total", session.stats.total_duration_ms)));
        }
    }

    // Failure reasons go to stderr in both modes; the export rows for
    // failed documents are intentionally empty.
    if !cli.quiet {
        for (name, reason) in session.failures() {
            eprintln!("  {} {}: {}", red("✗"), name, reason);
        }
    }

    Ok(())
}

/// Merge template, flags, and defaults into the prompt text and field spec.
///
/// Precedence: explicit flags beat template values beat defaults; columns
/// from flags are appended after template columns.
fn resolve_prompt_and_fields(cli: &Cli) -> Result<(String, FieldSpec)> {
    let template = match cli.template {
        Some(ref path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            Some(Template::from_json(&raw)?)
        }
        None => None,
    };

    let prompt_text = if let Some(ref p) = cli.prompt {
        p.clone()
    } else if let Some(ref path) = cli.prompt_file {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?
    } else if let Some(ref t) = template {
        t.prompt.clone()
    } else {
        DEFAULT_ANALYSIS_PROMPT.to_string()
    };

    if prompt_text.trim().is_empty() {
        bail!("The analysis prompt must not be empty.");
    }

    let mut fields = template
        .as_ref()
        .map(|t| t.field_spec())
        .unwrap_or_default();
    for column in &cli.columns {
        fields.add_column(column.clone());
    }

    Ok((prompt_text, fields))
}

/// Expand files and folders into the ordered document list.
fn collect_inputs(inputs: &[String]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_dir() {
            let mut found = collect_documents(&path)?;
            if found.is_empty() {
                eprintln!("{} No PDFs found under {}", cyan("⚠"), path.display());
            }
            documents.append(&mut found);
        } else {
            documents.push(Document::from_path(&path)?);
        }
    }
    Ok(documents)
}
