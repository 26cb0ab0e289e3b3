//! Spreadsheet export: single-sheet `.xlsx` built in memory.
//!
//! Numbers and booleans keep their cell types so totals stay summable in the
//! spreadsheet; everything else is written as a string.

use super::flatten::{Cell, FlatTable};
use crate::error::DocExtractError;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// Sheet name used for the single worksheet.
pub const SHEET_NAME: &str = "Sheet1";

/// Excel's hard column limit.
const MAX_COLUMNS: usize = 16_384;

/// Serialise `table` as an `.xlsx` workbook.
pub fn to_xlsx(table: &FlatTable) -> Result<Vec<u8>, DocExtractError> {
    if table.columns.len() > MAX_COLUMNS {
        return Err(DocExtractError::ExportFailed {
            format: "XLSX",
            detail: format!(
                "{} columns exceed the worksheet limit of {}",
                table.columns.len(),
                MAX_COLUMNS
            ),
        });
    }
    build_workbook(table).map_err(|e| DocExtractError::ExportFailed {
        format: "XLSX",
        detail: e.to_string(),
    })
}

fn build_workbook(table: &FlatTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, name) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header)?;
        }

        for (r, row) in table.rows.iter().enumerate() {
            let row_num = r as u32 + 1;
            for (c, cell) in row.iter().enumerate() {
                let col = c as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b)?;
                    }
                    Cell::Number(n) => match n.as_f64() {
                        Some(f) => {
                            worksheet.write_number(row_num, col, f)?;
                        }
                        None => {
                            worksheet.write_string(row_num, col, n.to_string())?;
                        }
                    },
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col, s)?;
                    }
                }
            }
        }

        worksheet.autofit();
    }

    workbook.save_to_buffer()
}
