//! Types for the conversion orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur while driving the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The engine could not be loaded or its capabilities listed.
    #[error("engine failed to load: {0}")]
    Load(#[source] EngineError),

    /// A transition was requested that the current state does not allow.
    #[error("invalid transition: cannot apply {event} in state {from}")]
    InvalidTransition { from: String, event: String },
}

/// Why a drop was refused. The state machine is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropRejection {
    /// Nothing was dropped.
    #[error("No file was dropped")]
    NoFile,

    /// More than one file was dropped.
    #[error("Only one file is allowed")]
    TooManyFiles { count: usize },

    /// The file name has no extension to match against.
    #[error("Cannot tell the format of \"{file_name}\": it has no extension")]
    MissingExtension { file_name: String },

    /// The engine cannot read files with this extension.
    #[error("Unsupported input format \"{extension}\"")]
    UnsupportedInput { extension: String },

    /// The engine cannot write the requested output format.
    #[error("Unsupported output format \"{format}\"")]
    UnsupportedOutput { format: String },

    /// The engine has not finished loading.
    #[error("The engine is still loading")]
    EngineLoading,

    /// A conversion is already running.
    #[error("A conversion is already in progress")]
    Busy,
}

impl DropRejection {
    /// Empty drops are ignored without a message.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NoFile)
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoFile => "no_file",
            Self::TooManyFiles { .. } => "too_many_files",
            Self::MissingExtension { .. } => "missing_extension",
            Self::UnsupportedInput { .. } => "unsupported_input",
            Self::UnsupportedOutput { .. } => "unsupported_output",
            Self::EngineLoading => "engine_loading",
            Self::Busy => "busy",
        }
    }
}

/// Why an accepted job ended in `Failed`.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to write input file: {0}")]
    Write(#[source] EngineError),

    #[error("Engine execution failed: {0}")]
    Execute(#[source] EngineError),

    #[error("Conversion failed with exit code {0}")]
    ExitCode(i32),

    #[error("Failed to read output file: {0}")]
    Read(#[source] EngineError),

    #[error("Engine produced an empty output file")]
    EmptyOutput,
}

impl ConversionError {
    /// Whether the engine ran and reported failure, as opposed to an I/O
    /// problem around it.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::ExitCode(_) | Self::EmptyOutput)
    }
}

/// One file handed over by the UI.
#[derive(Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase())
    }
}

impl fmt::Debug for DroppedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DroppedFile")
            .field("name", &self.name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// The job currently owned by the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique identifier (UUID).
    pub id: String,
    /// Name of the dropped file.
    pub input_name: String,
    /// Size of the dropped file.
    pub input_size_bytes: u64,
    /// Format abbreviation to convert to.
    pub output_format: String,
    /// Virtual file the engine writes and the orchestrator reads back.
    pub output_name: String,
    pub started_at: DateTime<Utc>,
}

impl ConversionJob {
    pub fn new(input_name: impl Into<String>, input_size_bytes: u64, output_format: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            input_name: input_name.into(),
            input_size_bytes,
            output_format: output_format.to_string(),
            output_name: output_file_name(output_format),
            started_at: Utc::now(),
        }
    }
}

/// Virtual output file name for a format.
pub fn output_file_name(output_format: &str) -> String {
    format!("output.{}", output_format)
}

/// A job accepted by `accept_drop`, ready to run.
#[derive(Debug)]
pub struct AcceptedJob {
    pub(crate) job: ConversionJob,
    pub(crate) input: DroppedFile,
}

impl AcceptedJob {
    pub fn job(&self) -> &ConversionJob {
        &self.job
    }
}

/// The produced file of a finished job.
#[derive(Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Arc<[u8]>,
}

impl ConversionOutput {
    pub fn new(file_name: impl Into<String>, output_format: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_for_format(output_format),
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn summary(&self) -> OutputSummary {
        OutputSummary {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.to_string(),
            size_bytes: self.size_bytes(),
        }
    }
}

impl fmt::Debug for ConversionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOutput")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// MIME type to advertise for a download of the given format.
pub fn mime_for_format(output_format: &str) -> &'static str {
    match output_format.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" | "matroska" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" | "adts" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Done(ConversionOutput),
    Failed(String),
}

impl ConversionOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Status values as the UI sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    #[serde(rename = "loading")]
    Loading,
    #[serde(rename = "loaded")]
    Loaded,
    #[serde(rename = "convert.start")]
    Converting,
    #[serde(rename = "convert.done")]
    Done,
    #[serde(rename = "convert.error")]
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Converting => "convert.start",
            Self::Done => "convert.done",
            Self::Failed => "convert.error",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and naming of a finished output, without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Everything the UI needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ConversionStatus,
    /// Display progress (0.0-100.0).
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<ConversionJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSummary>,
    /// Number of formats the engine reported.
    pub format_count: usize,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            status: ConversionStatus::Loading,
            progress_percent: 0.0,
            error: None,
            job: None,
            output: None,
            format_count: 0,
        }
    }
}
