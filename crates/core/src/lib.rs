pub mod capabilities;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod testing;

pub use capabilities::{parse_format_listing, FormatCatalog, FormatDescriptor};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{Engine, EngineConfig, EngineError, EngineEvent, FfmpegEngine};
pub use orchestrator::{
    ConversionOrchestrator, ConversionOutcome, ConversionOutput, ConversionStatus, DropRejection,
    DroppedFile, OrchestratorConfig, OrchestratorError, StatusSnapshot,
};
pub use progress::ProgressTracker;
