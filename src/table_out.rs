use std::path::Path;

use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::PipelineError;
use crate::options::OutputFormat;

/// Writes `rows` to `path`, preceded by a header row when `labels` is given.
/// The format follows the file extension.
pub fn write_table(
    path: &Path,
    labels: Option<&[String]>,
    rows: &[Vec<String>],
) -> Result<(), PipelineError> {
    match OutputFormat::from_path(path) {
        OutputFormat::Delimited => write_csv(path, labels, rows),
        OutputFormat::Workbook => write_workbook(path, labels, rows),
    }
}

pub(crate) fn write_csv(
    path: &Path,
    labels: Option<&[String]>,
    rows: &[Vec<String>],
) -> Result<(), PipelineError> {
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
    if let Some(labels) = labels {
        writer.write_record(labels)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

const EXTENT_PLACEHOLDER: &str = " ";

fn is_blank_at(row: &[String], column: usize) -> bool {
    row.get(column).is_none_or(String::is_empty)
}

pub(crate) fn write_workbook(
    path: &Path,
    labels: Option<&[String]>,
    rows: &[Vec<String>],
) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    let mut next_row: u32 = 0;
    if let Some(labels) = labels {
        for (column, label) in labels.iter().enumerate() {
            worksheet.write_string_with_format(
                next_row,
                sheet_column(column)?,
                label,
                &header_format,
            )?;
        }
        next_row += 1;
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let last = rows.len().saturating_sub(1);
    for (position, row) in rows.iter().enumerate() {
        for (column, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            worksheet.write_string(next_row, sheet_column(column)?, cell)?;
        }
        // Blank cells are not stored, so pin the table's corners with a
        // placeholder that readers trim back to an empty cell.
        if position == 0 && labels.is_none() && width > 0 && is_blank_at(row, width - 1) {
            worksheet.write_string(next_row, sheet_column(width - 1)?, EXTENT_PLACEHOLDER)?;
        }
        if position == last && position > 0 && row.iter().all(String::is_empty) {
            worksheet.write_string(next_row, 0, EXTENT_PLACEHOLDER)?;
        }
        next_row = next_row
            .checked_add(1)
            .ok_or_else(|| PipelineError::InvalidOption("too many rows for a worksheet".into()))?;
    }

    workbook.save(path)?;
    Ok(())
}

fn sheet_column(index: usize) -> Result<u16, PipelineError> {
    u16::try_from(index)
        .map_err(|_| PipelineError::InvalidOption(format!("column {index} exceeds worksheet width")))
}

#[cfg(test)]
mod tests {
    use super::write_table;

    #[test]
    fn writes_csv_with_header_row() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("merged.csv");
        let labels = vec!["date".to_string(), "col_2".to_string()];
        let rows = vec![vec!["1/1".to_string(), "a,b".to_string()]];

        write_table(&path, Some(labels.as_slice()), &rows).expect("csv should be written");

        let csv = std::fs::read_to_string(&path).expect("csv should be readable");
        assert_eq!(csv, "date,col_2\n1/1,\"a,b\"\n");
    }

    #[test]
    fn workbook_keeps_blank_edges_of_the_table() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("table_0.xlsx");
        let rows = vec![
            vec![String::new(), String::new(), String::new()],
            vec!["a".to_string(), String::new(), String::new()],
            vec!["b".to_string(), "c".to_string(), String::new()],
            vec![String::new(), String::new()],
        ];

        write_table(&path, None, &rows).expect("workbook should be written");
        let table = crate::ingest::read_table(&path).expect("workbook should be read back");

        let expected = vec![
            vec![String::new(); 3],
            vec!["a".to_string(), String::new(), String::new()],
            vec!["b".to_string(), "c".to_string(), String::new()],
            vec![String::new(); 3],
        ];
        assert_eq!(table.rows, expected);
    }

    #[test]
    fn writes_workbook_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("merged.xlsx");
        let rows = vec![vec!["x".to_string(), String::new()]];

        write_table(&path, None, &rows).expect("workbook should be written");

        let bytes = std::fs::read(&path).expect("workbook should be readable");
        assert!(bytes.starts_with(b"PK"));
    }
}
