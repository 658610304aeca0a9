//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Output format used when a drop does not ask for one.
    #[serde(default = "default_output_format")]
    pub default_output_format: String,

    /// Delete the input and output virtual files once a job ends.
    #[serde(default = "default_cleanup")]
    pub cleanup_files: bool,
}

fn default_output_format() -> String {
    "mp4".to_string()
}

fn default_cleanup() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_output_format: default_output_format(),
            cleanup_files: default_cleanup(),
        }
    }
}
