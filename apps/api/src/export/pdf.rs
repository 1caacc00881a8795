use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::export::{column_values, ExportError, COLUMN_HEADERS};
use crate::models::activity::ActivityRow;

// A4 landscape
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_HEIGHT: f32 = 6.0;
const FONT_SIZE: f32 = 7.5;

/// Column widths in mm; sums to the printable width.
const COLUMN_WIDTHS: [f32; 12] = [
    52.0, 20.0, 12.0, 20.0, 16.0, 15.0, 10.0, 28.0, 18.0, 28.0, 35.0, 19.0,
];

/// Cuts `text` to `max_chars`, marking the cut with "...".
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Rough character budget for a column at `FONT_SIZE`.
fn chars_for(width_mm: f32) -> usize {
    (width_mm / 1.6).floor() as usize
}

fn write_row(layer: &PdfLayerReference, font: &IndirectFontRef, cells: &[String], y: f32) {
    let mut x = MARGIN;
    for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
        layer.use_text(truncate(cell, chars_for(width)), FONT_SIZE, Mm(x), Mm(y), font);
        x += width;
    }
}

/// Renders `rows` as a paginated table. Each page repeats the header row.
pub fn render(rows: &[ActivityRow], generated_for: &str) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Activity Report", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let headers: Vec<String> = COLUMN_HEADERS.iter().map(|h| h.to_string()).collect();
    let mut layer = doc.get_page(first_page).get_layer(first_layer);

    let mut y = PAGE_HEIGHT - MARGIN;
    layer.use_text("Activity Report", 16.0, Mm(MARGIN), Mm(y), &bold);
    y -= 7.0;
    layer.use_text(
        format!(
            "Generated {} for {} ({} activities)",
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            generated_for,
            rows.len()
        ),
        9.0,
        Mm(MARGIN),
        Mm(y),
        &font,
    );
    y -= 10.0;
    write_row(&layer, &bold, &headers, y);
    y -= ROW_HEIGHT;

    if rows.is_empty() {
        layer.use_text("No activities match the selected filters.", 9.0, Mm(MARGIN), Mm(y), &font);
    }

    for row in rows {
        if y < MARGIN {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT - MARGIN;
            write_row(&layer, &bold, &headers, y);
            y -= ROW_HEIGHT;
        }
        write_row(&layer, &font, &column_values(row), y);
        y -= ROW_HEIGHT;
    }

    Ok(doc.save_to_bytes()?)
}
