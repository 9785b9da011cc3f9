use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("workbook read error: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed table markup: {0}")]
    Markup(String),

    #[error("image '{image}' produced table ordinal {ordinal} more than once")]
    DuplicateOrdinal { image: String, ordinal: usize },

    #[error("unsupported table file: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no usable tables to merge")]
    EmptyInput,
}

impl From<glob::GlobError> for PipelineError {
    fn from(error: glob::GlobError) -> Self {
        Self::Io(error.into_error())
    }
}
