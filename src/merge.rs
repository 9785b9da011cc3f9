use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::model::{MergedTable, RawTable};
use crate::options::{ColumnLabels, MergeOptions};
use crate::table_parse::{is_blank_row, max_width, normalize_rows};
use crate::warning::{MergeWarning, WarningCode};

struct PreparedTable {
    origin: PathBuf,
    rows: Vec<Vec<String>>,
}

fn prepare_tables(
    tables: Vec<RawTable>,
    options: &MergeOptions,
    warnings: &mut Vec<MergeWarning>,
) -> Vec<PreparedTable> {
    let mut prepared = Vec::with_capacity(tables.len());
    for table in tables {
        let skip_first_row = options.skip_first_row_for(table.source);
        let mut rows = table.rows;
        if skip_first_row && rows.len() > 1 {
            rows.remove(0);
        }
        rows.retain(|row| !is_blank_row(row));

        if rows.is_empty() {
            warnings.push(
                MergeWarning::new(
                    WarningCode::EmptyTableDiscarded,
                    "table has no non-empty rows after header handling",
                )
                .with_origin(&table.origin),
            );
            continue;
        }

        prepared.push(PreparedTable {
            origin: table.origin,
            rows,
        });
    }
    prepared
}

pub(crate) fn assign_labels(
    supplied: Option<&ColumnLabels>,
    width: usize,
    warnings: &mut Vec<MergeWarning>,
) -> Vec<String> {
    let leading = match supplied {
        Some(labels) if labels.len() <= width => labels.as_slice().to_vec(),
        Some(labels) => {
            warnings.push(
                MergeWarning::new(
                    WarningCode::LabelsIgnored,
                    format!(
                        "{} column labels supplied for {width} columns; using positional labels",
                        labels.len()
                    ),
                )
                .with_columns(width),
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    let start = leading.len();
    let mut labels = leading;
    labels.extend((start + 1..=width).map(|index| format!("col_{index}")));
    labels
}

fn dedup_rows(rows: Vec<Vec<String>>) -> (Vec<Vec<String>>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect::<Vec<_>>();
    let removed = before - kept.len();
    (kept, removed)
}

/// Reconciles ingested tables into one rectangular table.
///
/// Each table loses its first row when `skip_first_row` applies and the table
/// has more than one row, then loses its blank rows. Every remaining row is
/// right-padded to the widest table and rows are concatenated in input
/// order. Cells are aligned by position only: narrower tables are reported
/// as [`WarningCode::ColumnCountMismatch`], never shifted. Exact duplicate
/// rows are dropped, keeping the first occurrence.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] when no table has a usable row.
pub fn merge(tables: Vec<RawTable>, options: &MergeOptions) -> Result<MergedTable, PipelineError> {
    let mut warnings = Vec::new();
    let prepared = prepare_tables(tables, options, &mut warnings);
    if prepared.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let width = prepared
        .iter()
        .map(|table| max_width(&table.rows))
        .max()
        .unwrap_or(0);

    let mut rows = Vec::new();
    for table in &prepared {
        let table_width = max_width(&table.rows);
        if table_width < width {
            warnings.push(
                MergeWarning::new(
                    WarningCode::ColumnCountMismatch,
                    format!("table has {table_width} of {width} columns; padded on the right"),
                )
                .with_origin(&table.origin)
                .with_columns(table_width),
            );
        }
        rows.extend(normalize_rows(&table.rows, width));
    }

    let labels = assign_labels(options.column_labels.as_ref(), width, &mut warnings);

    let (rows, duplicates_removed) = if options.dedup {
        dedup_rows(rows)
    } else {
        (rows, 0)
    };
    if duplicates_removed > 0 {
        warnings.push(MergeWarning::new(
            WarningCode::DuplicateRowsRemoved,
            format!("removed {duplicates_removed} duplicate row(s)"),
        ));
    }

    Ok(MergedTable {
        labels,
        rows,
        table_count: prepared.len(),
        duplicates_removed,
        warnings,
    })
}
