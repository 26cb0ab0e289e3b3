//! Delimited-text export: UTF-8, header row, comma separated, `\n` line ends.

use super::flatten::FlatTable;
use crate::error::DocExtractError;

/// Serialise `table` as CSV bytes. A table without columns yields no bytes.
pub fn to_csv(table: &FlatTable) -> Result<Vec<u8>, DocExtractError> {
    if table.columns.is_empty() {
        return Ok(Vec::new());
    }

    let fail = |detail: String| DocExtractError::ExportFailed {
        format: "CSV",
        detail,
    };

    let mut wtr = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(&table.columns).map_err(|e| fail(e.to_string()))?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|c| c.to_string()))
            .map_err(|e| fail(e.to_string()))?;
    }

    wtr.into_inner().map_err(|e| fail(e.to_string()))
}
