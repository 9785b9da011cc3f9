#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use table_batch::{ImageSource, RecognitionError, TableArtifact, TableRecognizer};

pub enum Scripted {
    Tables(Vec<TableArtifact>),
    Nothing,
    Fail(&'static str),
}

/// Answers by image name and records every call in order.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: HashMap<String, Scripted>,
    pub calls: Vec<String>,
}

impl ScriptedRecognizer {
    pub fn with(mut self, image_name: &str, answer: Scripted) -> Self {
        self.script.insert(image_name.to_string(), answer);
        self
    }
}

impl TableRecognizer for ScriptedRecognizer {
    fn recognize(&mut self, image: &ImageSource) -> Result<Vec<TableArtifact>, RecognitionError> {
        self.calls.push(image.name.clone());
        match self.script.get(&image.name) {
            Some(Scripted::Tables(tables)) => Ok(tables.clone()),
            Some(Scripted::Fail(reason)) => Err(RecognitionError::Engine((*reason).to_string())),
            Some(Scripted::Nothing) | None => Ok(Vec::new()),
        }
    }
}

pub fn table(ordinal: usize, rows: &[&[&str]]) -> TableArtifact {
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
        .collect::<Vec<Vec<String>>>();
    TableArtifact::from_rows(ordinal, &rows)
}

pub fn touch_files(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"not really an image").expect("fixture file should be written");
    }
}

pub fn write_markup_table(path: &Path, rows: &[&[&str]]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("fixture dir should be created");
    }
    let body = rows
        .iter()
        .map(|row| {
            let cells = row
                .iter()
                .map(|cell| format!("<td>{cell}</td>"))
                .collect::<String>();
            format!("<tr>{cells}</tr>")
        })
        .collect::<String>();
    fs::write(path, format!("<html><body><table>{body}</table></body></html>"))
        .expect("fixture markup should be written");
}
