use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningCode {
    EmptyTableDiscarded,
    ColumnCountMismatch,
    DuplicateRowsRemoved,
    LabelsIgnored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWarning {
    pub code: WarningCode,
    pub message: String,
    pub origin: Option<PathBuf>,
    pub columns: Option<usize>,
}

impl MergeWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            origin: None,
            columns: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }
}
