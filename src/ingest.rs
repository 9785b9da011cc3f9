use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Reader, open_workbook_auto};
use csv::ReaderBuilder;
use glob::{MatchOptions, Pattern, glob_with};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::{RawTable, TableSource};
use crate::options::IngestOptions;
use crate::table_parse::{clean_cell_text, parse_markup_table};

const RECURSIVE_PATTERNS: [&str; 5] = ["**/*.html", "**/*.htm", "**/*.xlsx", "**/*.xls", "**/*.csv"];
const TOP_LEVEL_PATTERNS: [&str; 3] = ["*.xlsx", "*.xls", "*.csv"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub tables: Vec<RawTable>,
    pub skipped: Vec<SkippedFile>,
    pub files_found: usize,
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
}

fn source_for(path: &Path) -> Option<TableSource> {
    match lowercase_extension(path)?.as_str() {
        "html" | "htm" => Some(TableSource::Markup),
        "xlsx" | "xls" => Some(TableSource::Workbook),
        "csv" => Some(TableSource::Delimited),
        _ => None,
    }
}

/// A workbook or CSV file sitting next to an HTML file with the same stem is
/// a secondary export of that table.
fn is_secondary_export(path: &Path, candidates: &BTreeSet<PathBuf>) -> bool {
    if source_for(path) == Some(TableSource::Markup) {
        return false;
    }
    ["html", "htm", "HTML", "HTM"]
        .iter()
        .any(|extension| candidates.contains(&path.with_extension(extension)))
}

fn candidate_paths(root: &Path, options: &IngestOptions) -> Result<Vec<PathBuf>, PipelineError> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut found = BTreeSet::new();

    for suffix in RECURSIVE_PATTERNS.iter().chain(TOP_LEVEL_PATTERNS.iter()) {
        let pattern = format!("{escaped_root}/{suffix}");
        let entries = glob_with(&pattern, MATCH_OPTIONS).map_err(|source| {
            PipelineError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() && !options.is_excluded(&path) => {
                    found.insert(path);
                }
                Ok(_) => {}
                Err(error) => warn!("skipping unreadable path during discovery: {error}"),
            }
        }
    }

    let paths = found
        .iter()
        .filter(|path| {
            let secondary = is_secondary_export(path, &found);
            if secondary {
                debug!(path = %path.display(), "skipping secondary export of a markup table");
            }
            !secondary
        })
        .cloned()
        .collect();
    Ok(paths)
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, PipelineError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range?;
    let leading_columns = range.start().map_or(0, |(_, column)| column as usize);

    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![String::new(); leading_columns];
            cells.extend(row.iter().map(|cell| clean_cell_text(&cell.to_string())));
            cells
        })
        .collect();
    Ok(rows)
}

fn read_delimited(path: &Path) -> Result<Vec<Vec<String>>, PipelineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(clean_cell_text).collect());
    }
    Ok(rows)
}

/// Parses one exported table file according to its extension.
pub fn read_table(path: &Path) -> Result<RawTable, PipelineError> {
    let source =
        source_for(path).ok_or_else(|| PipelineError::UnsupportedFile(path.to_path_buf()))?;

    let rows = match source {
        TableSource::Markup => parse_markup_table(&fs::read_to_string(path)?)?,
        TableSource::Workbook => read_workbook(path)?,
        TableSource::Delimited => read_delimited(path)?,
    };
    Ok(RawTable::new(path, source, rows))
}

/// Walks `root` for exported tables and parses each one. Files that fail to
/// parse or hold no rows are reported in `skipped`; they never abort the walk.
pub fn discover(root: &Path, options: &IngestOptions) -> Result<Ingested, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::SourceNotFound(root.to_path_buf()));
    }

    let paths = candidate_paths(root, options)?;
    let files_found = paths.len();
    debug!(root = %root.display(), files = files_found, "table files discovered");

    let mut tables = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        match read_table(&path) {
            Ok(table) if table.rows.is_empty() => {
                warn!(path = %path.display(), "skipping table file without rows");
                skipped.push(SkippedFile {
                    path,
                    reason: "no table rows".to_string(),
                });
            }
            Ok(table) => tables.push(table),
            Err(error) => {
                warn!(path = %path.display(), "skipping unparseable table file: {error}");
                skipped.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(Ingested {
        tables,
        skipped,
        files_found,
    })
}
