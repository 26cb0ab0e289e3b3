//! Presenter/exporter: flatten the extracted JSON and serialise it.
//!
//! ```text
//! serde_json::Value ──▶ flatten ──▶ FlatTable ──┬─▶ workbook  (extracted_data.xlsx)
//!                                               └─▶ delimited (extracted_data.csv)
//! ```
//!
//! Artifacts are plain byte buffers; writing them to disk is left to
//! [`crate::extract::write_artifact`] so library callers can stream them
//! anywhere.

pub mod delimited;
pub mod flatten;
pub mod workbook;

pub use flatten::{flatten, Cell, FlatTable};

use crate::error::DocExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two downloadable formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Xlsx, ExportFormat::Csv];

    /// Fixed artifact file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "extracted_data.xlsx",
            ExportFormat::Csv => "extracted_data.csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Xlsx => f.write_str("xlsx"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// A serialised table ready to be saved or offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Serialise `table` in `format`. Regenerated on every call.
pub fn export_table(table: &FlatTable, format: ExportFormat) -> Result<ExportArtifact, DocExtractError> {
    let bytes = match format {
        ExportFormat::Xlsx => workbook::to_xlsx(table)?,
        ExportFormat::Csv => delimited::to_csv(table)?,
    };
    tracing::debug!("Exported {} → {} bytes", format, bytes.len());
    Ok(ExportArtifact {
        format,
        file_name: format.file_name().to_string(),
        bytes,
    })
}

/// Render `table` as an aligned plain-text grid for terminal display.
///
/// Wide tables are printed transposed (one `column | value` line per cell of
/// each row) because a single-row extraction can have dozens of columns.
pub fn render_text(table: &FlatTable) -> String {
    let width = table.columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (r, row) in table.rows.iter().enumerate() {
        if table.rows.len() > 1 {
            out.push_str(&format!("── row {} ──\n", r + 1));
        }
        for (name, cell) in table.columns.iter().zip(row) {
            out.push_str(&format!("{name:<width$}  {cell}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowLayout;
    use serde_json::json;

    #[test]
    fn artifact_names_are_fixed() {
        let t = flatten(&json!({"a": 1}), &RowLayout::SingleRow).unwrap();
        assert_eq!(export_table(&t, ExportFormat::Csv).unwrap().file_name, "extracted_data.csv");
        assert_eq!(export_table(&t, ExportFormat::Xlsx).unwrap().file_name, "extracted_data.xlsx");
    }

    #[test]
    fn text_render_is_transposed() {
        let t = flatten(&json!({"supplier_name": "ACME", "total_amount": 10}), &RowLayout::SingleRow)
            .unwrap();
        assert_eq!(render_text(&t), "supplier_name  ACME\ntotal_amount   10\n");
    }
}
