//! # edgequake-docextract
//!
//! Pull structured fields out of scanned business documents (purchase
//! orders, invoices, bank statements, ID documents, payslips) with a
//! vision-capable chat model, and export them as a spreadsheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image / PDF
//!  │
//!  ├─ 1. Input    extension check (.png .jpg .jpeg .pdf), read bytes
//!  ├─ 2. Render   PDF only: pages → bitmaps via pdfium (spawn_blocking)
//!  ├─ 3. Encode   base64 payloads, one per page, tagged image/jpeg
//!  ├─ 4. Request  one POST to chat completions with instruction + images
//!  ├─ 5. Parse    locate the JSON in the reply (fences, prose tolerated)
//!  └─ 6. Export   flatten → extracted_data.xlsx / extracted_data.csv
//! ```
//!
//! Each run is a single request/response round trip. Any failure ends the
//! run with a [`DocExtractError`]; there are no retries and no partial
//! results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docextract::{extract_to_dir, DocumentType, ExportFormat, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .document_type(DocumentType::PurchaseOrder)
//!         .build()?;
//!     let (output, files) = extract_to_dir("po.pdf", ".", &ExportFormat::ALL, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.data)?);
//!     eprintln!("wrote {:?}", files);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docextract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docextract = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! PDF input needs a pdfium shared library at runtime. Point
//! `PDFIUM_LIB_PATH` at the library (or its directory), drop it next to the
//! binary, or install it system-wide. Image input never touches pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod profiles;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, RowLayout};
pub use error::DocExtractError;
pub use export::{export_table, Cell, ExportArtifact, ExportFormat, FlatTable};
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_dir, inspect, inspect_with_password,
    write_artifact,
};
pub use output::{DocumentInfo, ExtractionOutput, ExtractionStats, InputInfo};
pub use pipeline::input::DocumentKind;
pub use profiles::{DocumentProfile, DocumentType, FieldSpec};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
