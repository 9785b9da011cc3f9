use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::markup::render_table_fragment;
use crate::table_parse::{max_width, normalize_rows};
use crate::warning::MergeWarning;

/// One input image, named after its file stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageSource {
    pub name: String,
    pub path: PathBuf,
}

impl ImageSource {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// One table found in one image. `markup` holds an HTML fragment with a `<table>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArtifact {
    pub ordinal: usize,
    pub markup: String,
}

impl TableArtifact {
    #[must_use]
    pub fn new(ordinal: usize, markup: impl Into<String>) -> Self {
        Self {
            ordinal,
            markup: markup.into(),
        }
    }

    #[must_use]
    pub fn from_rows(ordinal: usize, rows: &[Vec<String>]) -> Self {
        Self::new(ordinal, render_table_fragment(rows))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub success: usize,
    pub fail: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
}

impl RunStatistics {
    #[must_use]
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            total: 0,
            success: 0,
            fail: 0,
            elapsed: Duration::ZERO,
            started_at,
        }
    }

    #[must_use]
    pub fn average_per_image(&self) -> Option<Duration> {
        let total = u32::try_from(self.total).ok().filter(|&total| total > 0)?;
        Some(self.elapsed / total)
    }
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableSource {
    Markup,
    Workbook,
    Delimited,
}

/// A table as read from one file, padded to its own widest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub origin: PathBuf,
    pub source: TableSource,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Drops rows without cells and right-pads the rest to the widest row.
    #[must_use]
    pub fn new(origin: impl Into<PathBuf>, source: TableSource, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .collect::<Vec<_>>();
        let width = max_width(&rows);
        Self {
            origin: origin.into(),
            source,
            rows: normalize_rows(&rows, width),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        max_width(&self.rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub table_count: usize,
    pub duplicates_removed: usize,
    pub warnings: Vec<MergeWarning>,
}

impl MergedTable {
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::{ImageSource, RawTable, RunStatistics, TableSource};

    #[test]
    fn image_name_strips_extension() {
        let image = ImageSource::from_path("scans/page_01.JPG");
        assert_eq!(image.name, "page_01");
    }

    #[test]
    fn raw_table_pads_ragged_rows_and_drops_cellless_rows() {
        let table = RawTable::new(
            "a.html",
            TableSource::Markup,
            vec![
                vec!["a".to_string()],
                Vec::new(),
                vec!["b".to_string(), "c".to_string()],
            ],
        );
        assert_eq!(table.rows, vec![vec!["a", ""], vec!["b", "c"]]);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn average_is_none_without_images() {
        let mut stats = RunStatistics::empty(Utc::now());
        assert_eq!(stats.average_per_image(), None);

        stats.total = 4;
        stats.elapsed = Duration::from_secs(8);
        assert_eq!(stats.average_per_image(), Some(Duration::from_secs(2)));
    }
}
