use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::markup::render_document;
use crate::model::{ImageSource, TableArtifact};
use crate::options::ExportForms;
use crate::table_out::write_workbook;
use crate::table_parse::parse_markup_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportForm {
    Markup,
    Workbook,
    Record,
}

impl ExportForm {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markup => "html",
            Self::Workbook => "xlsx",
            Self::Record => "json",
        }
    }
}

impl Display for ExportForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A secondary export that could not be written. The markup file for the
/// same table is still in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub ordinal: usize,
    pub form: ExportForm,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    pub location: PathBuf,
    pub files: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

#[derive(Debug, Serialize)]
struct ArtifactRecord<'a> {
    image: &'a str,
    ordinal: usize,
    rows: &'a [Vec<String>],
    markup: &'a str,
}

#[must_use]
pub fn artifact_file_name(ordinal: usize, form: ExportForm) -> String {
    format!("table_{ordinal}.{}", form.extension())
}

/// Writes per-image table exports under `<root>/<image name>/`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    forms: ExportForms,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, forms: ExportForms) -> Self {
        Self {
            root: root.into(),
            forms,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn location_for(&self, image: &ImageSource) -> PathBuf {
        self.root.join(&image.name)
    }

    /// Stages every export in a hidden directory under the root, then
    /// renames it over the image's location. A run that stops midway
    /// leaves the previous location untouched.
    pub fn persist(
        &self,
        image: &ImageSource,
        artifacts: &[TableArtifact],
    ) -> Result<PersistReport, PipelineError> {
        let mut seen = BTreeSet::new();
        for artifact in artifacts {
            if !seen.insert(artifact.ordinal) {
                return Err(PipelineError::DuplicateOrdinal {
                    image: image.name.clone(),
                    ordinal: artifact.ordinal,
                });
            }
        }

        fs::create_dir_all(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", image.name))
            .tempdir_in(&self.root)?;

        let mut file_names = Vec::new();
        let mut failures = Vec::new();
        for artifact in artifacts {
            let markup_name = artifact_file_name(artifact.ordinal, ExportForm::Markup);
            let document = render_document(&image.name, artifact.ordinal, &artifact.markup);
            fs::write(staging.path().join(&markup_name), document)?;
            file_names.push(markup_name);

            if !self.forms.workbook && !self.forms.record {
                continue;
            }

            let rows = match parse_markup_table(&artifact.markup) {
                Ok(rows) => rows,
                Err(error) => {
                    for form in self.enabled_secondary_forms() {
                        failures.push(ExportFailure {
                            ordinal: artifact.ordinal,
                            form,
                            message: error.to_string(),
                        });
                    }
                    continue;
                }
            };

            for form in self.enabled_secondary_forms() {
                let name = artifact_file_name(artifact.ordinal, form);
                let path = staging.path().join(&name);
                let written = match form {
                    ExportForm::Workbook => write_workbook(&path, None, &rows),
                    ExportForm::Record => write_record(&path, image, artifact, &rows),
                    ExportForm::Markup => Ok(()),
                };
                match written {
                    Ok(()) => file_names.push(name),
                    Err(error) => failures.push(ExportFailure {
                        ordinal: artifact.ordinal,
                        form,
                        message: error.to_string(),
                    }),
                }
            }
        }

        for failure in &failures {
            warn!(
                image = %image.name,
                ordinal = failure.ordinal,
                form = %failure.form,
                "secondary export failed; markup export kept: {}",
                failure.message
            );
        }

        let location = self.location_for(image);
        if location.exists() {
            fs::remove_dir_all(&location)?;
        }
        fs::rename(staging.path(), &location)?;
        debug!(location = %location.display(), files = file_names.len(), "artifacts committed");

        let files = file_names
            .into_iter()
            .map(|name| location.join(name))
            .collect();
        Ok(PersistReport {
            location,
            files,
            failures,
        })
    }

    fn enabled_secondary_forms(&self) -> Vec<ExportForm> {
        let mut forms = Vec::new();
        if self.forms.workbook {
            forms.push(ExportForm::Workbook);
        }
        if self.forms.record {
            forms.push(ExportForm::Record);
        }
        forms
    }
}

fn write_record(
    path: &Path,
    image: &ImageSource,
    artifact: &TableArtifact,
    rows: &[Vec<String>],
) -> Result<(), PipelineError> {
    let record = ArtifactRecord {
        image: &image.name,
        ordinal: artifact.ordinal,
        rows,
        markup: &artifact.markup,
    };
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(path, json)?;
    Ok(())
}
