mod batch;
mod error;
mod ingest;
mod markup;
mod merge;
mod model;
mod options;
mod recognizer;
mod store;
mod table_out;
mod table_parse;
mod warning;

use std::path::{Path, PathBuf};

use tracing::info;

pub use batch::{
    BatchObserver, BatchRunner, IMAGE_EXTENSIONS, ImageOutcome, TracingObserver, discover_images,
};
pub use error::PipelineError;
pub use ingest::{Ingested, SkippedFile, discover, read_table};
pub use merge::merge;
pub use model::{ImageSource, MergedTable, RawTable, RunStatistics, TableArtifact, TableSource};
pub use options::{ColumnLabels, ExportForms, IngestOptions, MergeOptions, OutputFormat};
pub use recognizer::{CommandRecognizer, DEFAULT_TIMEOUT, RecognitionError, TableRecognizer};
pub use store::{ArtifactStore, ExportFailure, ExportForm, PersistReport, artifact_file_name};
pub use table_out::write_table;
pub use warning::{MergeWarning, WarningCode as MergeWarningCode};

pub const DEFAULT_MERGED_FILE: &str = "merged_results.xlsx";

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub output: PathBuf,
    pub files_found: usize,
    pub table_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub duplicates_removed: usize,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<MergeWarning>,
}

/// Relative output paths land inside the input directory.
#[must_use]
pub fn resolve_output_path(input_dir: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        input_dir.join(output)
    }
}

/// Discovers every exported table under `input_dir`, merges them and writes
/// the result to `output`. The output file itself is never read back in.
///
/// # Errors
///
/// [`PipelineError::SourceNotFound`] when `input_dir` does not exist,
/// [`PipelineError::EmptyInput`] when no usable table was found, and I/O or
/// export errors while writing `output`.
pub fn merge_directory(
    input_dir: &Path,
    output: &Path,
    options: &MergeOptions,
) -> Result<MergeReport, PipelineError> {
    let output = resolve_output_path(input_dir, output);
    let ingest_options = IngestOptions {
        exclude: vec![output.clone()],
    };

    let ingested = discover(input_dir, &ingest_options)?;
    info!(
        files = ingested.files_found,
        tables = ingested.tables.len(),
        skipped = ingested.skipped.len(),
        "table files ingested"
    );

    let merged = merge(ingested.tables, options)?;
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_table(&output, Some(merged.labels.as_slice()), &merged.rows)?;
    info!(
        rows = merged.rows.len(),
        columns = merged.column_count(),
        output = %output.display(),
        "merged table written"
    );

    Ok(MergeReport {
        output,
        files_found: ingested.files_found,
        table_count: merged.table_count,
        row_count: merged.rows.len(),
        column_count: merged.column_count(),
        duplicates_removed: merged.duplicates_removed,
        skipped: ingested.skipped,
        warnings: merged.warnings,
    })
}
