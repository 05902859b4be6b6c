use crate::domain::model::{Cell, Table};
use crate::utils::error::{EtlError, Result};
use crate::utils::text::truncate_chars;
use rust_xlsxwriter::{Format, Workbook};

/// Longest string a single spreadsheet cell accepts.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Renders `table` as a single-sheet workbook: a bold header row, then one
/// spreadsheet row per table row. Numbers stay numeric, missing cells stay blank.
pub fn workbook_bytes(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, column_number(col)?, name, &header_format)?;
    }

    let mut truncated = 0usize;
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| EtlError::processing("Too many rows for a worksheet"))?;
        for (col, cell) in row.iter().enumerate() {
            let col_num = column_number(col)?;
            match cell {
                Cell::Missing => {}
                Cell::Int(v) => {
                    worksheet.write_number(row_num, col_num, *v as f64)?;
                }
                Cell::Float(v) => {
                    worksheet.write_number(row_num, col_num, *v)?;
                }
                Cell::Text(s) => {
                    let value = truncate_chars(s, MAX_CELL_CHARS);
                    if value.len() < s.len() {
                        truncated += 1;
                    }
                    worksheet.write_string(row_num, col_num, value)?;
                }
            }
        }
    }

    if truncated > 0 {
        tracing::warn!(
            "Truncated {} cells to the {} character spreadsheet limit",
            truncated,
            MAX_CELL_CHARS
        );
    }

    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| EtlError::processing("Too many columns for a worksheet"))
}
