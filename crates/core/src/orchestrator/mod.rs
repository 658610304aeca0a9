//! Conversion orchestrator.
//!
//! Drives one dropped file at a time through the engine:
//! - **Loading**: load the engine and list its formats
//! - **Validation**: one file, known input extension, writable output format
//! - **Conversion**: write input, execute, read the output back
//!
//! State is exposed as [`StatusSnapshot`] values over a watch channel.

mod config;
mod runner;
mod state;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{ConversionOrchestrator, INPUT_FILE_NAME};
pub use state::{ConversionState, Transition};
pub use types::{
    mime_for_format, output_file_name, AcceptedJob, ConversionError, ConversionJob,
    ConversionOutcome, ConversionOutput, ConversionStatus, DropRejection, DroppedFile,
    OrchestratorError, OutputSummary, StatusSnapshot,
};
