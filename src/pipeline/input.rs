//! Input acquisition: turn a path or an in-memory upload into an
//! [`UploadedDocument`].
//!
//! The only validation is the extension check. Anything other than
//! `.png`, `.jpg`, `.jpeg` or `.pdf` is rejected before the file is read, so
//! an unsupported upload never reaches the encoder or the network.
//!
//! pdfium wants a file-system path, so PDF bytes are spilled to a
//! [`NamedTempFile`] via [`UploadedDocument::spill_to_tempfile`]. The file is
//! deleted when the handle drops, on success and on every error path.

use crate::error::DocExtractError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// What the encoder has to do with the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// png / jpg / jpeg: sent as-is.
    Image,
    /// pdf: rendered page by page.
    Pdf,
}

impl DocumentKind {
    /// Classify a filename by its extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, DocExtractError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") | Some("jpg") | Some("jpeg") => Ok(DocumentKind::Image),
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some(other) => Err(DocExtractError::UnsupportedFileType {
                extension: format!(".{other}"),
            }),
            None => Err(DocExtractError::UnsupportedFileType {
                extension: "(none)".to_string(),
            }),
        }
    }
}

/// A single uploaded file, owned by the current run.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl UploadedDocument {
    /// Wrap in-memory bytes, validating the declared filename's extension.
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DocExtractError> {
        let filename = filename.into();
        let kind = DocumentKind::from_filename(&filename)?;
        debug!("Accepted upload '{}' ({:?}, {} bytes)", filename, kind, bytes.len());
        Ok(Self {
            filename,
            bytes,
            kind,
        })
    }

    /// Read a local file. The extension is checked before any I/O.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocExtractError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let kind = DocumentKind::from_filename(&filename)?;

        let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
        debug!("Read '{}' ({:?}, {} bytes)", path.display(), kind, bytes.len());

        Ok(Self {
            filename,
            bytes,
            kind,
        })
    }

    /// Write the bytes to a scoped temp file (removed on drop).
    pub fn spill_to_tempfile(&self) -> Result<NamedTempFile, DocExtractError> {
        let suffix = match self.kind {
            DocumentKind::Pdf => ".pdf",
            DocumentKind::Image => ".img",
        };
        let mut tmp = tempfile::Builder::new()
            .prefix("docextract-")
            .suffix(suffix)
            .tempfile()
            .map_err(|e| DocExtractError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(&self.bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| DocExtractError::Internal(format!("tempfile write: {e}")))?;
        debug!("Spilled '{}' to {}", self.filename, tmp.path().display());
        Ok(tmp)
    }
}

fn read_error(path: &Path, e: std::io::Error) -> DocExtractError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => DocExtractError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => DocExtractError::PermissionDenied { path },
        _ => DocExtractError::ReadFailed { path, source: e },
    }
}
