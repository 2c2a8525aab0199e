use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use tracing::info;

use super::{Cell, Report, Sheet, COLUMNS, NOT_AVAILABLE};
use crate::errors::OutputError;

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    header_format: &Format,
    decimal_format: &Format,
) -> Result<(), OutputError> {
    worksheet.set_name(sheet.name())?;

    for (col, column) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.header, header_format)?;
        worksheet.set_column_width(col, column.width)?;
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row_num, col, text)?;
                }
                Cell::Number(number) => {
                    worksheet.write_number(row_num, col, *number)?;
                }
                Cell::Decimal(number) => {
                    worksheet.write_number_with_format(row_num, col, *number, decimal_format)?;
                }
                Cell::Missing => {
                    worksheet.write_string(row_num, col, NOT_AVAILABLE)?;
                }
            }
        }
    }

    let last_col = (COLUMNS.len() - 1) as u16;
    worksheet.autofilter(0, 0, sheet.rows.len() as u32, last_col)?;
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Write every sheet of the report to one `.xlsx` workbook.
pub fn write_workbook(report: &Report, path: &Path) -> Result<(), OutputError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    let decimal_format = Format::new().set_num_format("0.00");

    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet, &header_format, &decimal_format)?;
    }

    workbook.save(path)?;
    info!("📊 Saved workbook to {}", path.display());
    Ok(())
}
