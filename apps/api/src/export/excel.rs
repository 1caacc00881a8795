use rust_xlsxwriter::{Format, Workbook};

use crate::export::{column_values, ExportError, COLUMN_HEADERS};
use crate::models::activity::ActivityRow;

const COLUMN_WIDTHS: [f64; 13] = [
    40.0, 12.0, 8.0, 14.0, 10.0, 10.0, 6.0, 22.0, 12.0, 20.0, 16.0, 10.0, 14.0,
];

/// One sheet, header row frozen, TCO as a numeric trailing column.
pub fn render(rows: &[ActivityRow]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Activities")?;

    let bold = Format::new().set_bold();
    let tco_col = COLUMN_HEADERS.len() as u16;
    for (col, header) in COLUMN_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    sheet.write_string_with_format(0, tco_col, "TCO", &bold)?;

    for (i, activity) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, value) in column_values(activity).iter().enumerate() {
            sheet.write_string(row, col as u16, value)?;
        }
        if let Some(tco) = activity.tco_value {
            sheet.write_number(row, tco_col, tco)?;
        }
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}
