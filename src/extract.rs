//! One-call extraction entry points.
//!
//! Every call is an independent run: read the input, encode it, send one
//! request, parse the reply and flatten it. Nothing is cached or shared
//! between calls. Any error ends the run and is reported to the progress
//! callback via `on_error` before being returned.

use crate::config::ExtractionConfig;
use crate::error::DocExtractError;
use crate::export::{self, ExportArtifact, ExportFormat};
use crate::output::{DocumentInfo, ExtractionOutput, ExtractionStats, InputInfo};
use crate::pipeline::encode::{self, EncodedPayload};
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use crate::pipeline::{llm, render, reply};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Extract structured fields from the image or PDF at `path`.
///
/// # Errors
/// Every failure is fatal for the run; see [`DocExtractError`]. An
/// unsupported extension is rejected before the file is read.
///
/// # Example
/// ```rust,no_run
/// use edgequake_docextract::{extract, DocumentType, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::builder()
///     .api_key(std::env::var("OPENAI_API_KEY")?)
///     .document_type(DocumentType::Invoice)
///     .build()?;
/// let output = extract("invoice.pdf", &config).await?;
/// println!("{}", serde_json::to_string_pretty(&output.data)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, DocExtractError> {
    let start = Instant::now();
    let result = match UploadedDocument::from_path(path).await {
        Ok(doc) => run(doc, config, start).await,
        Err(e) => Err(e),
    };
    report_failure(result, config)
}

/// Extract from an in-memory upload. `filename` supplies the extension.
pub async fn extract_from_bytes(
    filename: impl Into<String>,
    bytes: Vec<u8>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, DocExtractError> {
    let start = Instant::now();
    let result = match UploadedDocument::from_bytes(filename, bytes) {
        Ok(doc) => run(doc, config, start).await,
        Err(e) => Err(e),
    };
    report_failure(result, config)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, DocExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(path, config))
}

/// Extract, then write the requested artifacts into `out_dir`.
///
/// Artifacts are written only after the extraction succeeded. Returns the
/// output together with the paths written, in `formats` order.
pub async fn extract_to_dir(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    formats: &[ExportFormat],
    config: &ExtractionConfig,
) -> Result<(ExtractionOutput, Vec<PathBuf>), DocExtractError> {
    let output = extract(path, config).await?;
    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let artifact = export::export_table(&output.table, format)?;
        written.push(write_artifact(&artifact, out_dir.as_ref()).await?);
    }
    Ok((output, written))
}

/// Save `artifact` as `out_dir/<file_name>`, replacing any previous file.
///
/// Uses atomic write (temp file + rename) so a reader never sees a partial
/// spreadsheet.
pub async fn write_artifact(
    artifact: &ExportArtifact,
    out_dir: &Path,
) -> Result<PathBuf, DocExtractError> {
    let path = out_dir.join(&artifact.file_name);
    let write_err = |source: std::io::Error| DocExtractError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(out_dir).await.map_err(write_err)?;

    let tmp_path = out_dir.join(format!("{}.tmp", artifact.file_name));
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(path)
}

/// Report the input kind and page count without calling the API.
pub async fn inspect(path: impl AsRef<Path>) -> Result<InputInfo, DocExtractError> {
    inspect_with_password(path, None).await
}

/// [`inspect`] for encrypted PDFs.
pub async fn inspect_with_password(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<InputInfo, DocExtractError> {
    let doc = UploadedDocument::from_path(path).await?;
    let pages = match doc.kind {
        DocumentKind::Image => 1,
        DocumentKind::Pdf => {
            let tmp = doc.spill_to_tempfile()?;
            render::page_count(tmp.path(), &doc.filename, password).await?
        }
    };
    Ok(InputInfo {
        size_bytes: doc.bytes.len(),
        filename: doc.filename,
        kind: doc.kind,
        pages,
    })
}

/// Turn an upload into its base64 payload.
///
/// Raster images are passed through unchanged. PDFs are spilled to a scoped
/// temp file, rendered page by page and JPEG-encoded; the temp file is gone
/// when this returns, whatever the outcome.
pub async fn encode_document(
    doc: &UploadedDocument,
    config: &ExtractionConfig,
) -> Result<EncodedPayload, DocExtractError> {
    match doc.kind {
        DocumentKind::Image => Ok(encode::encode_raster(&doc.bytes)),
        DocumentKind::Pdf => {
            let tmp = doc.spill_to_tempfile()?;
            let pages = render::render_pdf(tmp.path(), &doc.filename, config).await?;
            drop(tmp);
            encode::encode_pages(&pages, config.jpeg_quality)
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    doc: UploadedDocument,
    config: &ExtractionConfig,
    start: Instant,
) -> Result<ExtractionOutput, DocExtractError> {
    info!("Starting extraction: '{}' ({:?})", doc.filename, doc.kind);
    if let Some(ref cb) = config.progress_callback {
        cb.on_input_accepted(&doc.filename, doc.kind == DocumentKind::Pdf);
    }

    // ── Step 1: Encode ───────────────────────────────────────────────────
    let encode_start = Instant::now();
    let payload = encode_document(&doc, config).await?;
    let encode_duration_ms = encode_start.elapsed().as_millis() as u64;
    info!(
        "Encoded {} payload(s), {} bytes base64, in {}ms",
        payload.len(),
        payload.total_bytes(),
        encode_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_pages_encoded(payload.len(), payload.total_bytes());
    }

    // The raw upload is not needed past this point.
    let UploadedDocument {
        filename,
        bytes,
        kind,
    } = doc;
    let input_bytes = bytes.len();
    drop(bytes);

    // ── Step 2: Request ──────────────────────────────────────────────────
    let profile = config.effective_profile();
    let instruction = profile.instruction();
    debug!("Profile '{}': {} field(s)", profile.label, profile.fields.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(&config.model);
    }
    let completion = llm::request_extraction(&instruction, &payload, config).await?;

    // ── Step 3: Parse and flatten ────────────────────────────────────────
    let data = reply::parse_reply(&completion.content)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(completion.duration_ms);
    }
    let table = export::flatten(&data, &config.layout)?;

    let stats = ExtractionStats {
        input_bytes,
        payload_bytes: payload.total_bytes(),
        encode_duration_ms,
        api_duration_ms: completion.duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
        input_tokens: completion.usage.map(|u| u.prompt_tokens),
        output_tokens: completion.usage.map(|u| u.completion_tokens),
    };

    info!(
        "Extraction complete: {} column(s), {} row(s), {}ms total",
        table.columns.len(),
        table.rows.len(),
        stats.total_duration_ms
    );

    Ok(ExtractionOutput {
        data,
        table,
        document: DocumentInfo {
            filename,
            kind,
            pages: payload.len(),
            profile: profile.label,
        },
        stats,
    })
}

fn report_failure(
    result: Result<ExtractionOutput, DocExtractError>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, DocExtractError> {
    if let (Err(e), Some(cb)) = (&result, &config.progress_callback) {
        cb.on_error(&e.to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ExtractionProgressCallback;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ExtractionProgressCallback for Recorder {
        fn on_input_accepted(&self, filename: &str, is_pdf: bool) {
            self.0.lock().unwrap().push(format!("accepted {filename} pdf={is_pdf}"));
        }
        fn on_pages_encoded(&self, pages: usize, _payload_bytes: usize) {
            self.0.lock().unwrap().push(format!("encoded {pages}"));
        }
        fn on_error(&self, error: &str) {
            self.0.lock().unwrap().push(format!("error {error}"));
        }
    }

    fn config_with(recorder: &Arc<Recorder>) -> ExtractionConfig {
        ExtractionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unsupported_upload_reports_error() {
        let recorder = Arc::new(Recorder::default());
        let err = extract_from_bytes("scan.tiff", vec![1, 2, 3], &config_with(&recorder))
            .await
            .unwrap_err();
        assert!(matches!(err, DocExtractError::UnsupportedFileType { .. }));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error Unsupported file type '.tiff'"));
    }

    #[tokio::test]
    async fn missing_key_after_encoding() {
        let recorder = Arc::new(Recorder::default());
        let err = extract_from_bytes("po.png", b"\x89PNG fake".to_vec(), &config_with(&recorder))
            .await
            .unwrap_err();
        assert!(matches!(err, DocExtractError::MissingApiKey));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events[0], "accepted po.png pdf=false");
        assert_eq!(events[1], "encoded 1");
        assert!(events[2].starts_with("error No API key"));
    }

    #[tokio::test]
    async fn raster_payload_is_original_bytes() {
        let bytes = b"\xff\xd8\xff\xe0 not really a jpeg".to_vec();
        let doc = UploadedDocument::from_bytes("receipt.JPG", bytes.clone()).unwrap();
        let payload = encode_document(&doc, &ExtractionConfig::default()).await.unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(STANDARD.decode(&payload.images[0]).unwrap(), bytes);
    }

    #[tokio::test]
    async fn inspect_image_counts_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.png");
        std::fs::write(&path, b"png bytes").unwrap();
        let info = inspect(&path).await.unwrap();
        assert_eq!(info.kind, DocumentKind::Image);
        assert_eq!(info.pages, 1);
        assert_eq!(info.size_bytes, 9);
        assert_eq!(info.filename, "id.png");
    }

    #[tokio::test]
    async fn write_artifact_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let artifact = ExportArtifact {
            format: ExportFormat::Csv,
            file_name: "extracted_data.csv".into(),
            bytes: b"a,b\n1,2\n".to_vec(),
        };

        let path = write_artifact(&artifact, &out).await.unwrap();
        assert_eq!(path, out.join("extracted_data.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n");

        let second = ExportArtifact {
            bytes: b"a\n3\n".to_vec(),
            ..artifact
        };
        write_artifact(&second, &out).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"a\n3\n");
        assert!(!out.join("extracted_data.csv.tmp").exists());
    }
}
