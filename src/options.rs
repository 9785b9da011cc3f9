use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::TableSource;

/// Ordered column labels given as `a,b,c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLabels {
    labels: Vec<String>,
}

impl ColumnLabels {
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromStr for ColumnLabels {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let labels = spec
            .split(',')
            .map(str::trim)
            .map(str::to_string)
            .collect::<Vec<_>>();

        if labels.iter().all(String::is_empty) {
            return Err("column labels cannot be empty".to_string());
        }
        if let Some(position) = labels.iter().position(String::is_empty) {
            return Err(format!("column label {} is empty", position + 1));
        }

        Ok(Self { labels })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Drop each table's first row when the table has more than one row.
    pub skip_first_row: bool,
    /// Header treatment for workbook and CSV sourced tables; `None` follows `skip_first_row`.
    pub workbook_skip_first_row: Option<bool>,
    pub column_labels: Option<ColumnLabels>,
    pub dedup: bool,
}

impl MergeOptions {
    #[must_use]
    pub fn skip_first_row_for(&self, source: TableSource) -> bool {
        match source {
            TableSource::Markup => self.skip_first_row,
            TableSource::Workbook | TableSource::Delimited => self
                .workbook_skip_first_row
                .unwrap_or(self.skip_first_row),
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            skip_first_row: true,
            workbook_skip_first_row: None,
            column_labels: None,
            dedup: true,
        }
    }
}

/// Secondary export forms written next to the authoritative markup file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportForms {
    pub workbook: bool,
    pub record: bool,
}

impl Default for ExportForms {
    fn default() -> Self {
        Self {
            workbook: true,
            record: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub exclude: Vec<PathBuf>,
}

impl IngestOptions {
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|excluded| same_file(excluded, path))
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    if left == right {
        return true;
    }
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Workbook,
    Delimited,
}

impl OutputFormat {
    /// `.csv` selects delimited output; every other extension gets a workbook.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let is_csv = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
        if is_csv { Self::Delimited } else { Self::Workbook }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::str::FromStr;

    use super::{ColumnLabels, MergeOptions, OutputFormat};
    use crate::model::TableSource;

    #[test]
    fn parse_column_labels_trims_names() {
        let labels = ColumnLabels::from_str(" date , event,amount").expect("labels should parse");
        assert_eq!(labels.as_slice(), ["date", "event", "amount"]);
    }

    #[test]
    fn reject_blank_column_label() {
        let err = ColumnLabels::from_str("date,,amount").expect_err("blank label should fail");
        assert!(err.contains("column label 2 is empty"));

        let err = ColumnLabels::from_str(" , ").expect_err("all blank should fail");
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn workbook_header_treatment_follows_markup_by_default() {
        let options = MergeOptions::default();
        assert!(options.skip_first_row_for(TableSource::Workbook));

        let options = MergeOptions {
            workbook_skip_first_row: Some(false),
            ..MergeOptions::default()
        };
        assert!(options.skip_first_row_for(TableSource::Markup));
        assert!(!options.skip_first_row_for(TableSource::Delimited));
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/merged.CSV")),
            OutputFormat::Delimited
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("merged_results.xlsx")),
            OutputFormat::Workbook
        );
    }
}
