//! Error type for the edgequake-docextract library.
//!
//! Every failure is fatal for the current run: an extraction is a single
//! request/response round trip, so there is no partially-successful state to
//! report. [`DocExtractError`] is returned as `Err` from every `extract*`
//! entry point and from the individual pipeline stages.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-docextract library.
#[derive(Debug, Error)]
pub enum DocExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the input failed for another reason (a directory, an I/O error…).
    #[error("Failed to read input '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one of png, jpg, jpeg, pdf.
    #[error("Unsupported file type '{extension}'. Supported: .png, .jpg, .jpeg, .pdf")]
    UnsupportedFileType { extension: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{filename}' is corrupt: {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{filename}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { filename: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{filename}'")]
    WrongPassword { filename: String },

    /// pdfium-render returned an error for a specific page (0-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory), place the\n\
library next to the binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Encoding errors ───────────────────────────────────────────────────
    /// A rendered page could not be JPEG-encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncodingFailed { page: usize, detail: String },

    // ── API errors ────────────────────────────────────────────────────────
    /// No credential was supplied for the extraction call.
    #[error("No API key provided.\nPass --api-key or set OPENAI_API_KEY.")]
    MissingApiKey,

    /// The request never produced an HTTP response (DNS, TLS, timeout…).
    #[error("Request to '{endpoint}' failed: {detail}")]
    Transport { endpoint: String, detail: String },

    /// The API answered with a non-success status. `body` is shown verbatim.
    #[error("Failed to extract content (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// HTTP 200, but the body did not contain `choices[0].message.content`.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    // ── Reply parsing ─────────────────────────────────────────────────────
    /// The model's reply did not contain parseable JSON.
    #[error("JSON decoding error: {detail}")]
    InvalidJson { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The extracted value cannot be laid out as a table.
    #[error("Cannot tabulate extracted data: {0}")]
    NotTabular(String),

    /// Serialising the table to a given format failed.
    #[error("{format} export failed: {detail}")]
    ExportFailed { format: &'static str, detail: String },

    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom document profile file could not be loaded.
    #[error("Failed to load document profile '{path}': {detail}")]
    ProfileLoad { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_shows_body_verbatim() {
        let e = DocExtractError::ApiError {
            status: 401,
            body: r#"{"error":{"code":"invalid_api_key"}}"#.into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(r#"{"error":{"code":"invalid_api_key"}}"#), "got: {msg}");
        assert!(msg.contains("401"));
    }

    #[test]
    fn unsupported_type_display() {
        let e = DocExtractError::UnsupportedFileType {
            extension: ".gif".into(),
        };
        assert!(e.to_string().contains(".gif"));
    }

    #[test]
    fn rasterisation_display() {
        let e = DocExtractError::RasterisationFailed {
            page: 3,
            detail: "bitmap".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn invalid_json_display() {
        let e = DocExtractError::InvalidJson {
            detail: "expected value at line 1 column 1".into(),
        };
        assert!(e.to_string().starts_with("JSON decoding error"));
    }
}
