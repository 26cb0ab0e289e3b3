//! CLI binary for edgequake-docextract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, prints the extracted data and writes the exports.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docextract::export::render_text;
use edgequake_docextract::{
    export_table, extract, inspect_with_password, write_artifact, DocumentKind, DocumentProfile,
    DocumentType, ExportFormat, ExtractionConfig, ExtractionProgressCallback, ProgressCallback,
    RowLayout,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that narrates the pipeline stages and logs one line per
/// finished stage above itself.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the stage currently shown on the spinner.
    stage_start: Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: Mutex::new(Instant::now()),
        })
    }

    fn stage(&self, prefix: &'static str, msg: String) {
        if let Ok(mut t) = self.stage_start.lock() {
            *t = Instant::now();
        }
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn stage_secs(&self) -> f64 {
        self.stage_start
            .lock()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_input_accepted(&self, filename: &str, is_pdf: bool) {
        let kind = if is_pdf { "PDF" } else { "image" };
        self.stage("Encoding", format!("{filename} ({kind})"));
    }

    fn on_render_start(&self, total_pages: usize) {
        self.stage("Rendering", format!("{total_pages} page(s)"));
    }

    fn on_pages_encoded(&self, pages: usize, payload_bytes: usize) {
        self.bar.println(format!(
            "  {} Encoded {} page(s)  {}  {}",
            green("✓"),
            pages,
            dim(&format!("{:.1} KiB", payload_bytes as f64 / 1024.0)),
            dim(&format!("{:.1}s", self.stage_secs())),
        ));
    }

    fn on_request_start(&self, model: &str) {
        self.stage("Extracting", format!("waiting for {model}…"));
    }

    fn on_request_complete(&self, duration_ms: u64) {
        self.bar.println(format!(
            "  {} Reply parsed  {}",
            green("✓"),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
    }

    fn on_error(&self, error: &str) {
        // Keep only the first line; the full error is printed by main.
        let first = error.lines().next().unwrap_or(error);
        let msg = if first.chars().count() > 80 {
            format!("{}\u{2026}", first.chars().take(79).collect::<String>())
        } else {
            first.to_string()
        };
        self.bar.println(format!("  {} {}", red("✗"), red(&msg)));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a purchase order, write extracted_data.xlsx and extracted_data.csv
  docextract po.pdf

  # Invoice from a phone photo, CSV only, into ./out
  docextract --doc-type invoice --format csv --out-dir out receipt.jpg

  # One row per line item instead of items.0.x, items.1.x columns
  docextract --explode items po.pdf

  # Print the flattened table, write nothing
  docextract --table --no-export po.png

  # Full structured output (data, table, stats) as JSON
  docextract --json --no-export po.pdf > po.json

  # Custom field list
  docextract --profile delivery_note.json note.pdf

  # Inspect input only (no API key needed)
  docextract --inspect-only statement.pdf

DOCUMENT TYPES:
  purchase-order (default), invoice, bank-statement, identity-document,
  payslip, local-purchase-order

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          API key for the chat-completions endpoint
  DOCEXTRACT_MODEL        Override model ID (default gpt-4o)
  DOCEXTRACT_ENDPOINT     Override endpoint URL
  DOCEXTRACT_DOC_TYPE     Default document type
  DOCEXTRACT_OUT_DIR      Default output directory
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory), for PDF input
"#;

/// Extract structured fields from document images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "docextract",
    version,
    about = "Extract structured fields from document images and PDFs using a vision model",
    long_about = "Send a scanned purchase order, invoice, bank statement, ID document or payslip \
to an OpenAI-compatible vision model, parse the JSON it returns, and export the fields as \
extracted_data.xlsx / extracted_data.csv.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image (.png, .jpg, .jpeg) or PDF to extract from.
    input: PathBuf,

    /// Kind of document; selects the field list sent to the model.
    #[arg(long, env = "DOCEXTRACT_DOC_TYPE", value_enum, default_value = "purchase-order")]
    doc_type: DocTypeArg,

    /// API key for the endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, hide = true)]
    api_key: Option<String>,

    /// Directory the export files are written to.
    #[arg(long, env = "DOCEXTRACT_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Export format(s).
    #[arg(long, env = "DOCEXTRACT_FORMAT", value_enum, default_value = "both")]
    format: FormatArg,

    /// Emit one row per element of this array field (e.g. items).
    #[arg(long, env = "DOCEXTRACT_EXPLODE", value_name = "KEY")]
    explode: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "DOCEXTRACT_MODEL", default_value = edgequake_docextract::config::DEFAULT_MODEL)]
    model: String,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "DOCEXTRACT_ENDPOINT", default_value = edgequake_docextract::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Output-length ceiling for the reply.
    #[arg(long, env = "DOCEXTRACT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// PDF rendering DPI (72–400).
    #[arg(long, env = "DOCEXTRACT_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCEXTRACT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// JSON file with a custom document profile (label, fields, template).
    #[arg(long, env = "DOCEXTRACT_PROFILE", value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Request timeout in seconds (default: no timeout).
    #[arg(long, env = "DOCEXTRACT_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Print the full structured output (data, table, stats) as JSON.
    #[arg(long, env = "DOCEXTRACT_JSON")]
    json: bool,

    /// Print the flattened table instead of the raw JSON.
    #[arg(long, conflicts_with = "json")]
    table: bool,

    /// Do not write export files.
    #[arg(long, env = "DOCEXTRACT_NO_EXPORT")]
    no_export: bool,

    /// Print input kind and page count only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCEXTRACT_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCEXTRACT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DocTypeArg {
    PurchaseOrder,
    Invoice,
    BankStatement,
    IdentityDocument,
    Payslip,
    LocalPurchaseOrder,
}

impl From<DocTypeArg> for DocumentType {
    fn from(v: DocTypeArg) -> Self {
        match v {
            DocTypeArg::PurchaseOrder => DocumentType::PurchaseOrder,
            DocTypeArg::Invoice => DocumentType::Invoice,
            DocTypeArg::BankStatement => DocumentType::BankStatement,
            DocTypeArg::IdentityDocument => DocumentType::IdentityDocument,
            DocTypeArg::Payslip => DocumentType::Payslip,
            DocTypeArg::LocalPurchaseOrder => DocumentType::LocalPurchaseOrder,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Xlsx,
    Csv,
    Both,
}

impl FormatArg {
    fn formats(self) -> &'static [ExportFormat] {
        match self {
            FormatArg::Xlsx => &[ExportFormat::Xlsx],
            FormatArg::Csv => &[ExportFormat::Csv],
            FormatArg::Both => &ExportFormat::ALL,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect_with_password(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect input")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize input info")?
            );
        } else {
            let kind = match info.kind {
                DocumentKind::Image => "image (sent as-is)",
                DocumentKind::Pdf => "PDF (rendered per page)",
            };
            println!("File:   {}", info.filename);
            println!("Kind:   {}", kind);
            println!("Size:   {} bytes", info.size_bytes);
            println!("Pages:  {}", info.pages);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    if let Some(ref cb) = progress {
        cb.finish();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.table {
        print!("{}", render_text(&output.table));
    } else {
        let json =
            serde_json::to_string_pretty(&output.data).context("Failed to serialise data")?;
        println!("{json}");
    }

    // ── Export ───────────────────────────────────────────────────────────
    if !cli.no_export {
        for &format in cli.format.formats() {
            let artifact = export_table(&output.table, format)
                .with_context(|| format!("Failed to build {format} export"))?;
            let path = write_artifact(&artifact, &cli.out_dir)
                .await
                .with_context(|| format!("Failed to save {}", artifact.file_name))?;
            if !cli.quiet {
                eprintln!("{}  {}", green("→"), bold(&path.display().to_string()));
            }
        }
    }

    if !cli.quiet && !cli.json {
        let tokens = match (output.stats.input_tokens, output.stats.output_tokens) {
            (Some(i), Some(o)) => format!("{i} tokens in  /  {o} tokens out  —  "),
            _ => String::new(),
        };
        eprintln!(
            "   {}",
            dim(&format!(
                "{} page(s), {} column(s)  —  {}{}ms total",
                output.document.pages,
                output.table.columns.len(),
                tokens,
                output.stats.total_duration_ms
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .dpi(cli.dpi)
        .document_type(cli.doc_type.into());

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = cli.profile {
        let profile = DocumentProfile::from_json_file(path)
            .with_context(|| format!("Failed to load profile from {:?}", path))?;
        builder = builder.profile(profile);
    }
    if let Some(ref key) = cli.explode {
        builder = builder.layout(RowLayout::Explode { key: key.clone() });
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
