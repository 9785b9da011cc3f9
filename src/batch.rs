use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use glob::{MatchOptions, Pattern, glob_with};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::model::{ImageSource, RunStatistics};
use crate::recognizer::TableRecognizer;
use crate::store::ArtifactStore;

/// Raster formats picked up in addition to the caller's pattern, in any case.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Persisted { tables: usize, location: PathBuf },
    /// Tables were recognized but the store could not commit them.
    PersistFailed { tables: usize, reason: String },
    NoTables,
    RecognitionFailed(String),
}

impl ImageOutcome {
    /// An image succeeds once the recognizer returns at least one table,
    /// whether or not its artifacts could be saved.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Persisted { .. } | Self::PersistFailed { .. })
    }
}

/// Receives progress while a batch runs. Every method defaults to a no-op.
pub trait BatchObserver {
    fn on_start(&mut self, _total: usize) {}

    fn on_image(&mut self, _index: usize, _total: usize, _image: &ImageSource) {}

    fn on_outcome(
        &mut self,
        _index: usize,
        _total: usize,
        _image: &ImageSource,
        _outcome: &ImageOutcome,
    ) {
    }

    fn on_finish(&mut self, _stats: &RunStatistics) {}
}

impl BatchObserver for () {}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_start(&mut self, total: usize) {
        if total == 0 {
            warn!("no images found");
        } else {
            info!(total, "starting batch");
        }
    }

    fn on_image(&mut self, index: usize, total: usize, image: &ImageSource) {
        info!("[{index}/{total}] processing {}", image.path.display());
    }

    fn on_outcome(&mut self, index: usize, total: usize, image: &ImageSource, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Persisted { tables, location } => info!(
                "[{index}/{total}] {}: {tables} table(s) saved to {}",
                image.name,
                location.display()
            ),
            ImageOutcome::NoTables => warn!("[{index}/{total}] {}: no tables detected", image.name),
            ImageOutcome::RecognitionFailed(reason) => {
                warn!("[{index}/{total}] {}: recognition failed: {reason}", image.name);
            }
            ImageOutcome::PersistFailed { tables, reason } => warn!(
                "[{index}/{total}] {}: {tables} table(s) recognized but saving failed: {reason}",
                image.name
            ),
        }
    }

    fn on_finish(&mut self, stats: &RunStatistics) {
        let average = stats
            .average_per_image()
            .map_or(0.0, |average| average.as_secs_f64());
        info!(
            total = stats.total,
            success = stats.success,
            fail = stats.fail,
            "batch finished in {:.2}s ({average:.2}s per image)",
            stats.elapsed.as_secs_f64()
        );
    }
}

/// Gives `image` a name no earlier image took. A clash such as `a.jpg` and
/// `a.png` turns the later one into `a_png`, then `a_png_2` and so on.
fn claim_unique_name(image: ImageSource, taken: &mut HashSet<String>) -> ImageSource {
    let mut name = image.name.clone();
    if taken.contains(&name) {
        let extension = image
            .path
            .extension()
            .map(|extension| extension.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = if extension.is_empty() {
            image.name.clone()
        } else {
            format!("{}_{extension}", image.name)
        };
        name.clone_from(&base);
        let mut counter = 2_usize;
        while taken.contains(&name) {
            name = format!("{base}_{counter}");
            counter += 1;
        }
    }
    taken.insert(name.clone());
    ImageSource {
        name,
        path: image.path,
    }
}

/// Lists the images in `source_dir` matching `pattern` or any of
/// [`IMAGE_EXTENSIONS`], deduplicated and sorted by path. Names are unique
/// within the returned list, so every image gets its own output namespace.
///
/// # Errors
///
/// [`PipelineError::SourceNotFound`] when `source_dir` is not a directory and
/// [`PipelineError::InvalidPattern`] for a malformed `pattern`.
pub fn discover_images(source_dir: &Path, pattern: &str) -> Result<Vec<ImageSource>, PipelineError> {
    if !source_dir.is_dir() {
        return Err(PipelineError::SourceNotFound(source_dir.to_path_buf()));
    }

    let escaped_dir = Pattern::escape(&source_dir.to_string_lossy());
    let mut patterns = vec![(format!("{escaped_dir}/{pattern}"), true)];
    patterns.extend(
        IMAGE_EXTENSIONS
            .iter()
            .map(|extension| (format!("{escaped_dir}/*.{extension}"), false)),
    );

    let mut paths = BTreeSet::new();
    for (full_pattern, case_sensitive) in patterns {
        let options = MatchOptions {
            case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };
        let entries = glob_with(&full_pattern, options).map_err(|source| {
            PipelineError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    paths.insert(path);
                }
                Ok(_) => {}
                Err(error) => warn!("skipping unreadable path during discovery: {error}"),
            }
        }
    }

    debug!(dir = %source_dir.display(), images = paths.len(), "images discovered");
    let mut taken = HashSet::with_capacity(paths.len());
    Ok(paths
        .into_iter()
        .map(|path| claim_unique_name(ImageSource::from_path(path), &mut taken))
        .collect())
}

/// Drives one recognizer over a directory of images, one image at a time.
pub struct BatchRunner<R> {
    recognizer: R,
    store: ArtifactStore,
}

impl<R: TableRecognizer> BatchRunner<R> {
    #[must_use]
    pub fn new(recognizer: R, store: ArtifactStore) -> Self {
        Self { recognizer, store }
    }

    #[must_use]
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn into_recognizer(self) -> R {
        self.recognizer
    }

    /// Recognizes every discovered image exactly once and persists the
    /// tables of each success. A failing image is counted and skipped.
    ///
    /// # Errors
    ///
    /// Only discovery errors abort the run; see [`discover_images`].
    pub fn run(
        &mut self,
        source_dir: &Path,
        pattern: &str,
        observer: &mut dyn BatchObserver,
    ) -> Result<RunStatistics, PipelineError> {
        let images = discover_images(source_dir, pattern)?;
        let started_at = Utc::now();
        let clock = Instant::now();

        let total = images.len();
        let mut stats = RunStatistics::empty(started_at);
        stats.total = total;
        observer.on_start(total);

        for (position, image) in images.iter().enumerate() {
            let index = position + 1;
            observer.on_image(index, total, image);

            let outcome = self.process(image);
            if outcome.is_success() {
                stats.success += 1;
            } else {
                stats.fail += 1;
            }
            observer.on_outcome(index, total, image, &outcome);
        }

        stats.elapsed = clock.elapsed();
        observer.on_finish(&stats);
        Ok(stats)
    }

    fn process(&mut self, image: &ImageSource) -> ImageOutcome {
        let artifacts = match self.recognizer.recognize(image) {
            Ok(artifacts) if artifacts.is_empty() => return ImageOutcome::NoTables,
            Ok(artifacts) => artifacts,
            Err(error) => return ImageOutcome::RecognitionFailed(error.to_string()),
        };

        match self.store.persist(image, &artifacts) {
            Ok(report) => ImageOutcome::Persisted {
                tables: artifacts.len(),
                location: report.location,
            },
            Err(error) => ImageOutcome::PersistFailed {
                tables: artifacts.len(),
                reason: error.to_string(),
            },
        }
    }
}
