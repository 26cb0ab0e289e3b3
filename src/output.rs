//! Result types returned by [`crate::extract`].

use crate::export::FlatTable;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Parsed JSON from the model, unvalidated.
    pub data: serde_json::Value,
    /// `data` flattened according to the configured layout.
    pub table: FlatTable,
    pub document: DocumentInfo,
    pub stats: ExtractionStats,
}

/// Descriptor of the processed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub kind: DocumentKind,
    /// Image payloads sent: 1 for raster input, page count for PDFs.
    pub pages: usize,
    /// Label of the document profile used for the instruction.
    pub profile: String,
}

/// What [`crate::inspect`] learns about an input without calling the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    pub filename: String,
    pub kind: DocumentKind,
    pub size_bytes: usize,
    /// Number of payloads an extraction would send.
    pub pages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub input_bytes: usize,
    pub payload_bytes: usize,
    pub encode_duration_ms: u64,
    pub api_duration_ms: u64,
    pub total_duration_ms: u64,
    /// `None` when the API did not report usage.
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}
