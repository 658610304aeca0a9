//! Error types for the engine module.

use thiserror::Error;

/// Errors that can occur while talking to the media engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation was attempted before `load` succeeded.
    #[error("Engine is not loaded")]
    NotLoaded,

    /// The engine resources could not be fetched or initialized.
    #[error("Failed to load engine: {reason}")]
    Load { reason: String },

    /// A virtual file name is empty or tries to escape the virtual filesystem.
    #[error("Invalid virtual file name: {name:?}")]
    InvalidFileName { name: String },

    /// A virtual file does not exist.
    #[error("Virtual file not found: {name}")]
    FileNotFound { name: String },

    /// The engine process could not be run.
    #[error("Execution failed: {reason}")]
    Execution { reason: String },

    /// I/O error against the virtual filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a new load error.
    pub fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }

    /// Creates a new execution error.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

/// Checks that `name` is a plain file name inside the virtual filesystem.
pub(crate) fn check_file_name(name: &str) -> Result<(), EngineError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(EngineError::InvalidFileName {
            name: name.to_string(),
        });
    }
    Ok(())
}
