use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::model::{ImageSource, TableArtifact};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("failed to start recognition engine '{program}': {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },

    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),

    #[error("recognition engine exited with {status}: {stderr}")]
    ExitStatus { status: ExitStatus, stderr: String },

    #[error("unreadable recognition output: {0}")]
    Output(String),

    #[error("I/O error while talking to the recognition engine: {0}")]
    Io(#[from] io::Error),

    #[error("recognition failed: {0}")]
    Engine(String),
}

/// Turns one image into the tables found in it.
///
/// An empty list means the engine ran but found nothing; the batch runner
/// treats that the same as an error.
pub trait TableRecognizer {
    fn recognize(&mut self, image: &ImageSource) -> Result<Vec<TableArtifact>, RecognitionError>;
}

impl<R: TableRecognizer + ?Sized> TableRecognizer for Box<R> {
    fn recognize(&mut self, image: &ImageSource) -> Result<Vec<TableArtifact>, RecognitionError> {
        (**self).recognize(image)
    }
}

#[derive(Debug, Deserialize)]
struct LayoutRegion {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    res: serde_json::Value,
}

/// Reads the engine's JSON output: a list of layout regions, of which only
/// `{"type": "table", "res": {"html": ...}}` entries are kept. Ordinals count
/// tables only.
pub(crate) fn parse_engine_output(stdout: &[u8]) -> Result<Vec<TableArtifact>, RecognitionError> {
    let regions: Vec<LayoutRegion> = serde_json::from_slice(stdout)
        .map_err(|error| RecognitionError::Output(error.to_string()))?;

    let artifacts = regions
        .iter()
        .filter(|region| region.kind == "table")
        .filter_map(|region| region.res.get("html").and_then(serde_json::Value::as_str))
        .filter(|html| !html.trim().is_empty())
        .enumerate()
        .map(|(ordinal, html)| TableArtifact::new(ordinal, html))
        .collect();
    Ok(artifacts)
}

/// Runs an external engine once per image as `program [args..] <image path>`.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRecognizer {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join_output(handle: thread::JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>, RecognitionError> {
    handle
        .join()
        .map_err(|_| RecognitionError::Output("output reader thread panicked".to_string()))?
        .map_err(RecognitionError::from)
}

impl TableRecognizer for CommandRecognizer {
    fn recognize(&mut self, image: &ImageSource) -> Result<Vec<TableArtifact>, RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&image.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RecognitionError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RecognitionError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_output(stdout)?;
        let stderr = join_output(stderr)?;
        if !status.success() {
            return Err(RecognitionError::ExitStatus {
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        parse_engine_output(&stdout)
    }
}
