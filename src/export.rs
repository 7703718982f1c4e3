//! Spreadsheet rendering of projected export records.
//!
//! Pure formatting: a header row in declared field order, one data row per
//! record, and column widths sized to content. Failed documents arrive
//! here as identity-only rows; the export always runs even for a partially
//! failed batch.

use crate::error::AnalyzerError;
use crate::fields::FieldSpec;
use crate::output::ExportRecord;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};
use std::path::Path;

/// Worksheet tab name.
pub const SHEET_NAME: &str = "Analysis Results";

/// Upper bound on rendered column width, for readability.
const MAX_COLUMN_WIDTH: f64 = 50.0;

/// Render records into an in-memory XLSX workbook.
pub fn build_workbook(
    records: &[ExportRecord],
    fields: &FieldSpec,
) -> Result<Vec<u8>, AnalyzerError> {
    fill_workbook(records, fields)
        .and_then(|mut wb| wb.save_to_buffer())
        .map_err(|e| AnalyzerError::Internal(format!("workbook: {e}")))
}

/// Render records and write the workbook to `path`.
pub fn export_to_file(
    path: impl AsRef<Path>,
    records: &[ExportRecord],
    fields: &FieldSpec,
) -> Result<(), AnalyzerError> {
    let path = path.as_ref();
    fill_workbook(records, fields)
        .and_then(|mut wb| wb.save(path))
        .map_err(|e| AnalyzerError::ExportWriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

fn fill_workbook(records: &[ExportRecord], fields: &FieldSpec) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_size(11)
        .set_background_color(Color::RGB(0xD3D3D3))
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter);

    let cell_format = Format::new().set_align(FormatAlign::Top).set_text_wrap();

    for (col, field) in fields.names().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, field, &header_format)?;

        for (row, record) in records.iter().enumerate() {
            let value = record.get(field).map(String::as_str).unwrap_or("");
            worksheet.write_string_with_format(row as u32 + 1, col, value, &cell_format)?;
        }

        worksheet.set_column_width(col, column_width(field, records))?;
    }

    Ok(workbook)
}

/// Width of the widest line in the column (header included), plus padding,
/// capped at [`MAX_COLUMN_WIDTH`].
fn column_width(field: &str, records: &[ExportRecord]) -> f64 {
    let mut width = field.chars().count() + 2;
    for record in records {
        if let Some(value) = record.get(field) {
            let longest_line = value
                .split('\n')
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            width = width.max(longest_line + 2);
        }
    }
    (width as f64).min(MAX_COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> ExportRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn width_is_content_sized_and_capped() {
        let fields = [
            record(&[("Summary", "short")]),
            record(&[("Summary", "a much longer value that says something")]),
        ];
        assert_eq!(
            column_width("Summary", &fields),
            "a much longer value that says something".len() as f64 + 2.0
        );

        let huge = record(&[("Summary", &"x".repeat(300))]);
        assert_eq!(column_width("Summary", &[huge]), MAX_COLUMN_WIDTH);
    }

    #[test]
    fn width_considers_longest_line_of_multiline_values() {
        let rows = [record(&[("Notes", "one\na considerably longer line\ntwo")])];
        assert_eq!(
            column_width("Notes", &rows),
            "a considerably longer line".len() as f64 + 2.0
        );
    }

    #[test]
    fn workbook_builds_for_mixed_records() {
        let fields = FieldSpec::new(["Summary"]);
        let records = vec![
            record(&[("Document Name", "a.pdf"), ("Summary", "ok")]),
            record(&[("Document Name", "bad.pdf"), ("Summary", "")]),
        ];

        let bytes = build_workbook(&records, &fields).unwrap();
        // XLSX is a ZIP container: PK magic.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn export_to_file_writes_the_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let fields = FieldSpec::new(["Summary"]);
        let records = vec![record(&[("Document Name", "a.pdf"), ("Summary", "ok")])];

        export_to_file(&path, &records, &fields).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn export_failure_carries_the_path() {
        let fields = FieldSpec::new(["Summary"]);
        let err =
            export_to_file("/definitely/not/a/dir/out.xlsx", &[], &fields).unwrap_err();
        assert!(matches!(err, AnalyzerError::ExportWriteFailed { .. }));
    }
}
